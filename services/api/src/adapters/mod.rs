pub mod identity;
pub mod paper_search;
pub mod store;

pub use identity::SupabaseAuth;
pub use paper_search::SemanticScholarAdapter;
pub use store::SupabaseStore;

pub mod domain;
pub mod ports;
pub mod routing;
pub mod views;

#[cfg(any(test, feature = "memory"))]
pub mod memory;

pub use domain::{
    AdvancedSearchParams, AuthSession, AuthenticatedUser, Folder, FolderUpdate, Identity,
    NewFolder, NewProfile, Notice, NoticeKind, Paper, PaperAuthor, PaperQuery, Profile,
    ProfileUpdate, PublicationType, SearchFilters, SearchHistoryEntry,
};
pub use ports::{DataStore, IdentityProvider, PaperSearchService, PortError, PortResult};
pub use routing::{guard, Route, RouteDecision, SessionState};

pub mod catalog;
pub mod domain;
pub mod map;
pub mod ports;
pub mod search;
pub mod session;
pub mod stats;
pub mod theme;
pub mod validation;
pub mod viewport;
pub mod visited;

pub use catalog::CountryCatalog;
pub use domain::{AuthSession, CountryFeature, PasswordResetToken, User, UserCredentials, VisitedEntry, ViewportState};
pub use map::{ClickOutcome, MapSurface, RenderedCountry};
pub use ports::{
    CatalogSource, DatabaseService, NotificationService, PortError, PortResult,
    VisitedCountriesRepository,
};
pub use stats::Progress;
pub use theme::{Theme, ThemeProvider};
pub use visited::{AckOutcome, PendingWrite, VisitedSetStore, WriteAck};

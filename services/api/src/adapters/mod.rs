pub mod db;
pub mod geo;
#[cfg(test)]
pub mod memory;
pub mod notify;

pub use db::DbAdapter;
pub use geo::HttpCatalogSource;
#[cfg(test)]
pub use memory::InMemoryDb;
pub use notify::LogNotifier;

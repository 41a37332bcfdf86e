pub mod credentials;

pub use credentials::FileCredentialStore;

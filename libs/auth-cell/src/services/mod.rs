pub mod directory;
pub mod users;

pub use directory::CredentialDirectory;
pub use users::UserService;

mod login;
pub use login::Login;

mod protected;
pub use protected::Protected;

mod home;
pub use home::Home;

mod notes;
pub use notes::Notes;

mod files;
pub use files::Files;

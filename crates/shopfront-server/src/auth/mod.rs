pub mod middleware;
pub mod password;
pub mod reset;
pub mod session;
pub mod token;

pub mod filtered_user;
pub mod login;
pub mod register;
pub mod token_claims;
pub mod uuid;

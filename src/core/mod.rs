pub mod outcome;
pub mod schema;
pub mod submitter;
pub mod transformer;
pub mod validator;

pub mod exceptions;
pub mod template;
pub mod validator;

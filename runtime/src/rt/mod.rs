pub mod class;
pub mod context;
pub mod declaration;
pub mod field;
pub mod method;
pub mod object;

pub mod common;
pub mod route;
pub mod rules;
pub mod run;
pub mod track;

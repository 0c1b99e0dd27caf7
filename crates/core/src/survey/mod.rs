pub mod machine;
pub mod states;

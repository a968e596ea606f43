pub mod compress;
pub mod run;

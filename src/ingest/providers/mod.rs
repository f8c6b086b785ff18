pub mod vieon;

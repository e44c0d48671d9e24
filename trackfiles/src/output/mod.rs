pub mod tdb;

pub mod diddoc;

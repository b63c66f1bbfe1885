pub mod test_utils;

mod test_redundancy;

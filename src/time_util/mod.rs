pub mod days;
pub mod mytime;
pub mod slots;
#[cfg(test)]
pub mod test_utils;

//! Configuration access port trait.

pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    fn get_int(&self, section: &str, key: &str, default: i64) -> i64;
    fn get_double(&self, section: &str, key: &str, default: f64) -> f64;
    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool;

    /// Window sizes and counts; negative values read as 0 so validation rejects them.
    fn get_usize(&self, section: &str, key: &str, default: usize) -> usize {
        let value = self.get_int(section, key, default as i64);
        usize::try_from(value).unwrap_or(0)
    }
}

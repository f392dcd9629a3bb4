pub mod analyze;
pub mod audit;
pub mod events;
pub mod health;

#[cfg(test)]
pub(crate) mod test_support;

//! Process-wide driver registry.
//!
//! Nothing is registered implicitly; hosts call [`register`] once at
//! startup (calling it again is harmless) and then resolve connection
//! strings through [`connect`].

use std::sync::Arc;

use log::{debug, error};
use once_cell::sync::Lazy;
use parking_lot::Mutex;

use super::Driver;
use super::error::SqlError;
use super::options::OptionMap;
use crate::connection::Connection;

static REGISTRY: Lazy<Mutex<Vec<Arc<Driver>>>> = Lazy::new(|| Mutex::new(Vec::new()));

fn find(drivers: &[Arc<Driver>], scheme: &str) -> Option<Arc<Driver>> {
    drivers
        .iter()
        .find(|driver| driver.config().scheme.eq_ignore_ascii_case(scheme))
        .cloned()
}

fn insert(drivers: &mut Vec<Arc<Driver>>, driver: Driver) -> Result<Arc<Driver>, SqlError> {
    let scheme = driver.config().scheme.clone();
    if scheme.trim().is_empty() {
        return Err(SqlError::Registration {
            message: "driver scheme is empty".to_string(),
        });
    }
    if find(drivers, &scheme).is_some() {
        return Err(SqlError::Registration {
            message: format!("a driver for '{scheme}' is already registered"),
        });
    }
    let driver = Arc::new(driver);
    drivers.push(Arc::clone(&driver));
    debug!("registered driver for '{scheme}'");
    Ok(driver)
}

/// Register the default driver. Idempotent.
///
/// A failure is logged and returned, never raised as a panic.
pub fn register() -> Result<Arc<Driver>, SqlError> {
    let driver = Driver::new();
    let mut drivers = REGISTRY.lock();
    if let Some(existing) = find(&drivers, &driver.config().scheme) {
        return Ok(existing);
    }
    insert(&mut drivers, driver).inspect_err(|e| error!("Couldn't register sqlsheet driver: {e}"))
}

/// Add a driver; its scheme must be non-empty and not taken.
pub fn register_driver(driver: Driver) -> Result<Arc<Driver>, SqlError> {
    insert(&mut REGISTRY.lock(), driver)
}

/// Remove the driver answering to `scheme`.
pub fn deregister_driver(scheme: &str) -> Option<Arc<Driver>> {
    let mut drivers = REGISTRY.lock();
    let index = drivers
        .iter()
        .position(|driver| driver.config().scheme.eq_ignore_ascii_case(scheme))?;
    Some(drivers.remove(index))
}

/// First registered driver accepting `url`.
pub fn driver_for(url: &str) -> Option<Arc<Driver>> {
    REGISTRY
        .lock()
        .iter()
        .find(|driver| driver.accepts_url(url))
        .cloned()
}

/// Connect through whichever registered driver accepts `url`.
pub fn connect(url: &str, info: &OptionMap) -> Result<Connection, SqlError> {
    let drivers: Vec<Arc<Driver>> = REGISTRY.lock().clone();
    for driver in drivers {
        if let Some(connection) = driver.connect(url, info)? {
            return Ok(connection);
        }
    }
    Err(SqlError::NoSuitableDriver {
        url: url.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::DriverConfig;

    fn driver(scheme: &str) -> Driver {
        Driver::new().with_config(DriverConfig::default().with_scheme(scheme))
    }

    #[test]
    fn test_register_is_idempotent() {
        let first = register().unwrap();
        let second = register().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_duplicate_scheme_rejected() {
        register_driver(driver("jdbc:dup-test:")).unwrap();
        let err = register_driver(driver("JDBC:DUP-TEST:")).unwrap_err();
        assert!(matches!(err, SqlError::Registration { .. }));
        assert!(deregister_driver("jdbc:dup-test:").is_some());
    }

    #[test]
    fn test_empty_scheme_rejected() {
        assert!(matches!(
            register_driver(driver(" ")),
            Err(SqlError::Registration { .. })
        ));
    }

    #[test]
    fn test_lookup_and_no_suitable_driver() {
        register_driver(driver("jdbc:lookup-test:")).unwrap();
        assert!(driver_for("jdbc:lookup-test:file:///tmp/a.xlsx").is_some());
        assert!(driver_for("jdbc:nobody:file:///tmp/a.xlsx").is_none());

        let err = connect("jdbc:nobody:file:///tmp/a.xlsx", &OptionMap::new()).unwrap_err();
        assert!(matches!(err, SqlError::NoSuitableDriver { .. }));
        deregister_driver("jdbc:lookup-test:");
    }
}

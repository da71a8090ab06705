//! Country-level geofencing lists

use parking_lot::RwLock;
use std::collections::HashSet;

/// Countries flagged as high risk at construction
pub const DEFAULT_HIGH_RISK_COUNTRIES: [&str; 7] = ["NG", "RU", "UA", "RO", "ID", "PH", "VN"];

/// Countries blocked at construction
pub const DEFAULT_BLOCKED_COUNTRIES: [&str; 4] = ["KP", "IR", "SY", "CU"];

#[derive(Debug)]
struct CountrySets {
    high_risk: HashSet<String>,
    blocked: HashSet<String>,
}

/// High-risk and blocked country lookup.
///
/// Both sets sit behind one read/write lock, so lookups never observe a
/// half-applied update. Codes are matched case-insensitively.
#[derive(Debug)]
pub struct GeofenceChecker {
    sets: RwLock<CountrySets>,
}

impl GeofenceChecker {
    /// Create a checker seeded with the default lists
    pub fn new() -> Self {
        Self {
            sets: RwLock::new(CountrySets {
                high_risk: DEFAULT_HIGH_RISK_COUNTRIES.iter().map(|c| c.to_string()).collect(),
                blocked: DEFAULT_BLOCKED_COUNTRIES.iter().map(|c| c.to_string()).collect(),
            }),
        }
    }

    /// Check if a country is high risk
    pub fn is_high_risk_country(&self, country: &str) -> bool {
        self.sets.read().high_risk.contains(&normalize(country))
    }

    /// Check if a country is blocked
    pub fn is_blocked_country(&self, country: &str) -> bool {
        self.sets.read().blocked.contains(&normalize(country))
    }

    /// Flag a country as high risk
    pub fn add_high_risk_country(&self, country: &str) {
        self.sets.write().high_risk.insert(normalize(country));
    }

    /// Remove a country from the high-risk list
    pub fn remove_high_risk_country(&self, country: &str) {
        self.sets.write().high_risk.remove(&normalize(country));
    }

    /// Block a country
    pub fn add_blocked_country(&self, country: &str) {
        self.sets.write().blocked.insert(normalize(country));
    }

    /// Unblock a country
    pub fn remove_blocked_country(&self, country: &str) {
        self.sets.write().blocked.remove(&normalize(country));
    }

    /// Sorted snapshot of the high-risk list
    pub fn high_risk_countries(&self) -> Vec<String> {
        let mut countries: Vec<String> = self.sets.read().high_risk.iter().cloned().collect();
        countries.sort();
        countries
    }

    /// Sorted snapshot of the blocked list
    pub fn blocked_countries(&self) -> Vec<String> {
        let mut countries: Vec<String> = self.sets.read().blocked.iter().cloned().collect();
        countries.sort();
        countries
    }
}

impl Default for GeofenceChecker {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize(country: &str) -> String {
    country.trim().to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_default_lists() {
        let checker = GeofenceChecker::new();

        assert_eq!(
            checker.high_risk_countries(),
            vec!["ID", "NG", "PH", "RO", "RU", "UA", "VN"]
        );
        assert_eq!(checker.blocked_countries(), vec!["CU", "IR", "KP", "SY"]);
        assert!(checker.is_high_risk_country("NG"));
        assert!(checker.is_blocked_country("KP"));
        assert!(!checker.is_high_risk_country("US"));
        assert!(!checker.is_blocked_country("NG"));
    }

    #[test]
    fn test_case_insensitive_lookup() {
        let checker = GeofenceChecker::new();
        assert!(checker.is_high_risk_country("ng"));
        assert!(checker.is_blocked_country(" ir "));
    }

    #[test]
    fn test_add_remove_round_trip() {
        let checker = GeofenceChecker::new();
        let before = checker.high_risk_countries();

        checker.add_high_risk_country("BR");
        assert!(checker.is_high_risk_country("BR"));
        checker.remove_high_risk_country("BR");
        assert_eq!(checker.high_risk_countries(), before);

        checker.add_blocked_country("XX");
        assert!(checker.is_blocked_country("XX"));
        checker.remove_blocked_country("XX");
        assert!(!checker.is_blocked_country("XX"));
        assert_eq!(checker.blocked_countries().len(), 4);
    }

    #[test]
    fn test_concurrent_updates_and_lookups() {
        let checker = Arc::new(GeofenceChecker::new());
        let mut handles = Vec::new();

        for i in 0..8 {
            let checker = Arc::clone(&checker);
            handles.push(std::thread::spawn(move || {
                let code = format!("Z{}", i);
                for _ in 0..1_000 {
                    checker.add_high_risk_country(&code);
                    assert!(checker.is_high_risk_country("NG"));
                    checker.remove_high_risk_country(&code);
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(checker.high_risk_countries().len(), 7);
    }
}

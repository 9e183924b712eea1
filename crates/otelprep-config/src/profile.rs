//! Deployment profiles.
//!
//! A profile says which parts of the configuration exist for a deployment:
//! whether postgres instances are monitored (and whether there is one or a
//! list), whether the CloudWatch-style auxiliary exporter is configured, and
//! whether a log shipper runs next to the collector.
//! The resolver and the patcher are driven by the same descriptor.

use std::fmt;
use std::str::FromStr;

use crate::ConfigError;

/// How monitored instances are supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceMode {
    /// The profile monitors no instances.
    None,
    /// Exactly one instance, described by scalar fields.
    Single,
    /// Any number of instances, described by a list.
    List,
}

/// A deployment profile descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Profile {
    name: &'static str,
    instances: InstanceMode,
    auxiliary_exporter: bool,
    log_shipping: bool,
}

impl Profile {
    /// One postgres instance scraped through a fixed receiver, with its
    /// server logs shipped alongside.
    pub const POSTGRES: Profile = Profile {
        name: "postgres",
        instances: InstanceMode::Single,
        auxiliary_exporter: false,
        log_shipping: true,
    };

    /// Any number of postgres instances, one generated receiver each.
    pub const POSTGRES_MULTI: Profile = Profile {
        name: "postgres-multi",
        instances: InstanceMode::List,
        auxiliary_exporter: false,
        log_shipping: false,
    };

    /// CloudWatch metrics only.
    pub const CLOUDWATCH: Profile = Profile {
        name: "cloudwatch",
        instances: InstanceMode::None,
        auxiliary_exporter: true,
        log_shipping: false,
    };

    /// Postgres instances plus CloudWatch metrics for their RDS hosts.
    pub const RDS: Profile = Profile {
        name: "rds",
        instances: InstanceMode::List,
        auxiliary_exporter: true,
        log_shipping: false,
    };

    /// Every built-in profile.
    pub const ALL: [Profile; 4] = [Self::POSTGRES, Self::POSTGRES_MULTI, Self::CLOUDWATCH, Self::RDS];

    /// Profile name as accepted on the command line.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// How instances are supplied.
    pub fn instances(&self) -> InstanceMode {
        self.instances
    }

    /// Whether the auxiliary exporter is part of this profile.
    pub fn has_auxiliary_exporter(&self) -> bool {
        self.auxiliary_exporter
    }

    /// Whether a log shipper is configured next to the collector.
    pub fn ships_logs(&self) -> bool {
        self.log_shipping
    }
}

impl Default for Profile {
    fn default() -> Self {
        Self::POSTGRES_MULTI
    }
}

impl FromStr for Profile {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.name.eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                let names: Vec<_> = Self::ALL.iter().map(Profile::name).collect();
                ConfigError::invalid_value("profile", s, format!("expected one of {}", names.join(", ")))
            })
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_profiles() {
        assert_eq!("postgres".parse::<Profile>().unwrap(), Profile::POSTGRES);
        assert_eq!("RDS".parse::<Profile>().unwrap(), Profile::RDS);
        assert_eq!(" cloudwatch ".parse::<Profile>().unwrap(), Profile::CLOUDWATCH);
        assert!("mysql".parse::<Profile>().is_err());
    }

    #[test]
    fn test_descriptors() {
        assert_eq!(Profile::POSTGRES.instances(), InstanceMode::Single);
        assert!(!Profile::POSTGRES.has_auxiliary_exporter());
        assert_eq!(Profile::CLOUDWATCH.instances(), InstanceMode::None);
        assert!(Profile::RDS.has_auxiliary_exporter());
        assert_eq!(Profile::RDS.instances(), InstanceMode::List);
        assert!(Profile::POSTGRES.ships_logs());
        assert!(!Profile::POSTGRES_MULTI.ships_logs());
        assert!(!Profile::RDS.ships_logs());
    }

    #[test]
    fn test_names_round_trip() {
        for profile in Profile::ALL {
            assert_eq!(profile.to_string().parse::<Profile>().unwrap(), profile);
        }
    }
}

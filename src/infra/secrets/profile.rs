//! Active profile resolution.

use super::types::Profile;
use crate::config::{ConfigEnvironment, ACTIVE_PROFILES_PROPERTY};

/// Resolve the single active profile.
///
/// The first explicitly activated profile wins. Otherwise the first
/// comma-separated token of `spring.profiles.active` is used.
pub fn resolve_active_profile(environment: &ConfigEnvironment) -> Option<Profile> {
    if let Some(first) = environment.active_profiles().first() {
        return Profile::new(first);
    }

    environment
        .get_property(ACTIVE_PROFILES_PROPERTY)
        .and_then(|value| value.split(',').next())
        .and_then(Profile::new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EnvVars, PropertySource};

    fn environment(active: &[&str], property: Option<&str>) -> ConfigEnvironment {
        let mut env = ConfigEnvironment::new(EnvVars::default());
        env.set_active_profiles(active.iter().copied());
        if let Some(value) = property {
            env.add_last(PropertySource::new(
                "props",
                [(ACTIVE_PROFILES_PROPERTY, value)].into_iter().collect(),
            ));
        }
        env
    }

    #[test]
    fn explicit_active_profiles_win() {
        let env = environment(&["qa", "dev"], Some("prod"));
        assert_eq!(resolve_active_profile(&env).unwrap().as_str(), "qa");
    }

    #[test]
    fn falls_back_to_first_requested_token() {
        let env = environment(&[], Some(" uat , prod"));
        assert_eq!(resolve_active_profile(&env).unwrap().as_str(), "uat");
    }

    #[test]
    fn blank_leading_token_means_no_profile() {
        let env = environment(&[], Some(" , prod"));
        assert!(resolve_active_profile(&env).is_none());
    }

    #[test]
    fn no_profile_anywhere() {
        assert!(resolve_active_profile(&environment(&[], None)).is_none());
        assert!(resolve_active_profile(&environment(&[], Some(""))).is_none());
    }

    #[test]
    fn relaxed_env_binding_is_honoured() {
        let mut env = ConfigEnvironment::new(EnvVars::default());
        env.add_last(PropertySource::relaxed(
            "systemEnvironment",
            [("SPRING_PROFILES_ACTIVE", "dev")].into_iter().collect(),
        ));
        assert_eq!(resolve_active_profile(&env).unwrap().as_str(), "dev");
    }
}

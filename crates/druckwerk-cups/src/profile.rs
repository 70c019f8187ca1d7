// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Active printer profile resolution.
//
// The profile is process-wide state: computed once, handed out cheaply,
// and replaced wholesale by an explicit refresh.  Resolution prefers the
// configured printer, auto-selects when exactly one device is available
// (zero-configuration operation), and otherwise falls back to the
// "no printer selected" sentinel.

use std::sync::RwLock;

use tracing::{info, instrument};

use druckwerk_core::{PrintConfig, PrinterProfile};

use crate::discovery;

/// Owner of the cached printer profile.
///
/// The cache holds one atomically-replaceable value: `refresh` computes a
/// complete new profile before publishing it, and readers only ever see a
/// fully-formed profile.  Nothing is mutated in place.
pub struct ProfileHandle {
    config: PrintConfig,
    cached: RwLock<Option<PrinterProfile>>,
}

impl ProfileHandle {
    pub fn new(config: PrintConfig) -> Self {
        Self {
            config,
            cached: RwLock::new(None),
        }
    }

    /// The active profile, resolving it on first access.
    pub async fn current(&self) -> PrinterProfile {
        if let Some(profile) = self
            .cached
            .read()
            .expect("profile cache lock poisoned")
            .clone()
        {
            return profile;
        }
        self.refresh().await
    }

    /// Recompute the profile from configuration and discovery, then
    /// replace the cached value.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> PrinterProfile {
        let available = discovery::list_printers(&self.config).await;
        let profile = resolve_profile(self.config.printer_profile.as_deref(), &available);
        info!(profile = %profile, "printer profile resolved");

        *self.cached.write().expect("profile cache lock poisoned") = Some(profile.clone());
        profile
    }
}

/// Pick the active profile from the configured name and the discovered
/// printer list.
///
/// - A valid configured name wins when discovery confirms it, or when
///   discovery came back empty (empty means "unknown", not "gone").
/// - With no usable configuration and exactly one discovered printer,
///   that printer is auto-selected.
/// - Otherwise the sentinel profile is returned and explicit
///   configuration is required.
pub fn resolve_profile(configured: Option<&str>, available: &[String]) -> PrinterProfile {
    if let Some(name) = configured
        && let Ok(profile) = PrinterProfile::named(name)
        && (available.is_empty() || available.iter().any(|a| a.as_str() == profile.name()))
    {
        return profile;
    }

    if available.len() == 1
        && let Ok(profile) = PrinterProfile::named(&available[0])
    {
        return profile;
    }

    PrinterProfile::unconfigured()
}

#[cfg(test)]
mod tests {
    use super::*;
    use druckwerk_core::types::DEFAULT_PRINTER_PROFILE;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn single_available_printer_without_config_selects_printer() {
        let profile = resolve_profile(None, &names(&["Solo_Printer"]));
        assert_eq!(profile.name(), "Solo_Printer");
        assert!(profile.is_configured());
    }

    #[test]
    fn sentinel_configuration_behaves_like_no_configuration() {
        let profile = resolve_profile(Some(DEFAULT_PRINTER_PROFILE), &names(&["Solo_Printer"]));
        assert_eq!(profile.name(), "Solo_Printer");
    }

    #[test]
    fn multiple_printers_still_require_explicit_selection() {
        let profile = resolve_profile(None, &names(&["Office_Printer", "Lab_Printer"]));
        assert!(!profile.is_configured());
    }

    #[test]
    fn existing_selection_is_respected_when_available() {
        let profile = resolve_profile(
            Some("Lab_Printer"),
            &names(&["Office_Printer", "Lab_Printer"]),
        );
        assert_eq!(profile.name(), "Lab_Printer");
    }

    #[test]
    fn configured_name_survives_a_discovery_outage() {
        let profile = resolve_profile(Some("Office_Printer"), &[]);
        assert_eq!(profile.name(), "Office_Printer");
    }

    #[test]
    fn configured_name_missing_from_listing_falls_back() {
        let profile = resolve_profile(Some("Gone_Printer"), &names(&["A_Printer", "B_Printer"]));
        assert!(!profile.is_configured());

        let profile = resolve_profile(Some("Gone_Printer"), &names(&["Solo_Printer"]));
        assert_eq!(profile.name(), "Solo_Printer");
    }

    #[cfg(unix)]
    mod handle {
        use super::*;
        use std::os::unix::fs::PermissionsExt;

        fn fake_lpstat(dir: &std::path::Path, listing: &str) -> String {
            let path = dir.join("fake-lpstat");
            std::fs::write(&path, format!("#!/bin/sh\nprintf '%s\\n' \"{listing}\"\n"))
                .expect("write script");
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
                .expect("chmod script");
            path.to_string_lossy().into_owned()
        }

        fn config_with_lpstat(lpstat: String) -> PrintConfig {
            PrintConfig {
                tools: druckwerk_core::config::ToolConfig {
                    lpstat,
                    ..Default::default()
                },
                ..PrintConfig::default()
            }
        }

        #[tokio::test]
        async fn auto_selects_the_only_discovered_printer() {
            let dir = tempfile::tempdir().expect("tempdir");
            let lpstat = fake_lpstat(dir.path(), "Solo_Printer accepting requests since Tue");
            let handle = ProfileHandle::new(config_with_lpstat(lpstat));

            let profile = handle.current().await;
            assert_eq!(profile.name(), "Solo_Printer");

            // Second read comes from the cache.
            let again = handle.current().await;
            assert_eq!(again, profile);
        }

        #[tokio::test]
        async fn refresh_replaces_the_cached_value() {
            let dir = tempfile::tempdir().expect("tempdir");
            let lpstat = fake_lpstat(dir.path(), "Solo_Printer accepting requests since Tue");
            let handle = ProfileHandle::new(config_with_lpstat(lpstat.clone()));
            assert_eq!(handle.current().await.name(), "Solo_Printer");

            // Discovery now reports two printers; refresh must recompute
            // and land on the sentinel.
            let dir2 = tempfile::tempdir().expect("tempdir");
            let two = fake_lpstat(
                dir2.path(),
                "A_Printer accepting requests\nB_Printer accepting requests",
            );
            let handle = ProfileHandle::new(config_with_lpstat(two));
            let profile = handle.refresh().await;
            assert!(!profile.is_configured());
        }

        #[tokio::test]
        async fn discovery_failure_with_no_config_yields_sentinel() {
            let handle =
                ProfileHandle::new(config_with_lpstat("druckwerk-no-such-lpstat".into()));
            let profile = handle.current().await;
            assert!(!profile.is_configured());
        }
    }
}

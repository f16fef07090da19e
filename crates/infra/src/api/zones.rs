//! Zone reconciliation
//!
//! Folds the server's zone list for a monitor into the local configuration.
//! The merge only ever adds: new zones are inserted, local stubs without
//! points are completed, and points a user has set are never replaced.
//! Running it twice against the same inputs changes nothing the second time.

use std::collections::HashSet;
use std::sync::Arc;

use regex::Regex;
use tracing::{debug, info, instrument, warn};
use zmapi_domain::{DetectionSettings, EventData, MonitorConfigs, Resolution, ServerZone, ZoneDefinition};

use super::commands::ApiCommands;
use super::errors::ApiError;

/// Zone import switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ZoneImportSettings {
    pub import_zones: bool,
    pub match_origin_zone: bool,
}

impl From<&DetectionSettings> for ZoneImportSettings {
    fn from(settings: &DetectionSettings) -> Self {
        Self { import_zones: settings.import_zones, match_origin_zone: settings.match_origin_zone }
    }
}

impl ZoneImportSettings {
    /// Global switch, overridden by the monitor's own `import_zones`.
    pub fn enabled_for(&self, monitors: &MonitorConfigs, monitor_id: u32) -> bool {
        monitors
            .get(&monitor_id)
            .and_then(|m| m.import_zones)
            .unwrap_or(self.import_zones)
    }
}

/// What one reconciliation pass is about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileContext {
    pub monitor_id: u32,
    /// Recorded with imported zones.
    pub resolution: Option<Resolution>,
    /// Event cause text, consulted when matching on origin zone.
    pub event_cause: Option<String>,
}

impl ReconcileContext {
    pub fn new(monitor_id: u32, resolution: Option<Resolution>) -> Self {
        Self { monitor_id, resolution, event_cause: None }
    }

    #[must_use]
    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        self.event_cause = Some(cause.into());
        self
    }

    /// Context for the monitor that recorded `event`, or `None` when the
    /// monitor id does not fit.
    pub fn from_event(event: &EventData) -> Option<Self> {
        let monitor_id = u32::try_from(event.monitor.id).ok()?;
        Some(Self {
            monitor_id,
            resolution: event.monitor.resolution(),
            event_cause: event.event.cause.clone(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneChangeKind {
    /// Zone was not known locally.
    Added,
    /// Local stub received the server's points.
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneChange {
    pub name: String,
    pub kind: ZoneChangeKind,
    /// The definition as it will be stored.
    pub zone: ZoneDefinition,
}

/// Changes one pass makes to a monitor's zones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneDelta {
    pub monitor_id: u32,
    /// The monitor had no local entry; applying creates one.
    pub bootstrap_monitor: bool,
    /// In server order.
    pub changes: Vec<ZoneChange>,
}

impl ZoneDelta {
    pub fn empty(monitor_id: u32) -> Self {
        Self { monitor_id, bootstrap_monitor: false, changes: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty() && !self.bootstrap_monitor
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.changes.iter().map(|c| c.name.as_str())
    }

    /// Write the changes into `monitors`. Zones that gained points since
    /// the delta was planned are left alone.
    pub fn apply(&self, monitors: &mut MonitorConfigs) {
        if self.is_empty() {
            return;
        }

        let entry = monitors.entry(self.monitor_id).or_default();
        for change in &self.changes {
            match entry.zones.get_mut(&change.name) {
                Some(existing) if existing.has_points() => {}
                Some(existing) => {
                    existing.points = change.zone.points.clone();
                    existing.resolution = change.zone.resolution;
                }
                None => {
                    entry.zones.insert(change.name.clone(), change.zone.clone());
                }
            }
        }
    }
}

/// Case-insensitive whole-word search for `name` inside `cause`.
///
/// Word boundaries are any non-alphanumeric character, so names that begin
/// or end in punctuation still match.
pub fn match_origin_zone(name: &str, cause: &str) -> bool {
    let name = name.trim();
    if name.is_empty() {
        return false;
    }
    let pattern = format!(r"(?i)(?:^|[^\w]){}(?:[^\w]|$)", regex::escape(name));
    match Regex::new(&pattern) {
        Ok(re) => re.is_match(cause),
        Err(err) => {
            warn!(zone = name, error = %err, "cannot build origin zone pattern");
            false
        }
    }
}

/// Compute the delta for one monitor without touching any state.
pub fn plan(
    settings: ZoneImportSettings,
    server_zones: &[ServerZone],
    monitors: &MonitorConfigs,
    ctx: &ReconcileContext,
) -> ZoneDelta {
    let mut delta = ZoneDelta::empty(ctx.monitor_id);
    if !settings.enabled_for(monitors, ctx.monitor_id) {
        return delta;
    }

    let local = monitors.get(&ctx.monitor_id);
    let mut seen: HashSet<&str> = HashSet::new();
    let mut selected = false;

    for zone in server_zones {
        if zone.is_inactive() {
            debug!(zone = %zone.name, "skipping inactive zone");
            continue;
        }
        if settings.match_origin_zone {
            let cause = ctx.event_cause.as_deref().unwrap_or_default();
            if !match_origin_zone(&zone.name, cause) {
                debug!(zone = %zone.name, "zone not named in event cause");
                continue;
            }
        }
        if !seen.insert(zone.name.as_str()) {
            warn!(zone = %zone.name, "duplicate zone name from server, keeping the first");
            continue;
        }
        selected = true;

        match local.and_then(|m| m.zones.get(&zone.name)) {
            None => delta.changes.push(ZoneChange {
                name: zone.name.clone(),
                kind: ZoneChangeKind::Added,
                zone: ZoneDefinition {
                    points: zone.points.clone(),
                    resolution: ctx.resolution,
                    active: true,
                },
            }),
            Some(existing) if !existing.has_points() && !zone.points.is_empty() => {
                delta.changes.push(ZoneChange {
                    name: zone.name.clone(),
                    kind: ZoneChangeKind::Completed,
                    zone: ZoneDefinition {
                        points: zone.points.clone(),
                        resolution: ctx.resolution,
                        active: existing.active,
                    },
                });
            }
            Some(_) => {}
        }
    }

    delta.bootstrap_monitor = selected && local.is_none();
    delta
}

/// Pulls server zones and merges them into local monitor settings.
pub struct ZoneReconciler {
    commands: Arc<ApiCommands>,
    settings: ZoneImportSettings,
}

impl ZoneReconciler {
    pub fn new(commands: Arc<ApiCommands>, settings: ZoneImportSettings) -> Self {
        Self { commands, settings }
    }

    pub fn settings(&self) -> ZoneImportSettings {
        self.settings
    }

    pub fn plan(
        &self,
        server_zones: &[ServerZone],
        monitors: &MonitorConfigs,
        ctx: &ReconcileContext,
    ) -> ZoneDelta {
        plan(self.settings, server_zones, monitors, ctx)
    }

    /// Fetch the monitor's zones, merge them and return what changed.
    ///
    /// Nothing is fetched when import is disabled for the monitor.
    ///
    /// # Errors
    /// Failures fetching the zone list; `monitors` is untouched then.
    #[instrument(skip(self, monitors), fields(monitor_id = ctx.monitor_id))]
    pub async fn reconcile(
        &self,
        monitors: &mut MonitorConfigs,
        ctx: &ReconcileContext,
    ) -> Result<ZoneDelta, ApiError> {
        if !self.settings.enabled_for(monitors, ctx.monitor_id) {
            debug!("zone import disabled");
            return Ok(ZoneDelta::empty(ctx.monitor_id));
        }

        let server_zones = self.commands.get_zones(ctx.monitor_id).await?;
        let delta = self.plan(&server_zones, monitors, ctx);
        delta.apply(monitors);

        if !delta.is_empty() {
            info!(
                bootstrap = delta.bootstrap_monitor,
                zones = ?delta.names().collect::<Vec<_>>(),
                "imported zones"
            );
        }
        Ok(delta)
    }
}

//! The engine: inbound event intake, interaction attempts, and the
//! tick-driven periodic work (boundary checks, machine sweeps, settle
//! window).
//!
//! One `Engine` exists per participating process. The [`Session`] inside it
//! is the shared, replicated state; the engine itself holds only
//! process-local runtime (authority flag, local player, throttles, pending
//! harvest owner). Followers never recompute territory state once locked —
//! they apply the host's replicated message verbatim.

use crate::boundary::BoundaryEnforcer;
use crate::chain::{self, CollectOutcome, StrikeOutcome};
use crate::commons::{self, DepositOutcome, ShipOutcome};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::id::ResourceId;
use crate::model::farm::{BuildingKind, ObjectKind};
use crate::model::layout::{Quadrant, Tile};
use crate::model::player::PlayerId;
use crate::model::tag::{EntityRef, OwnerTag};
use crate::model::territory::{HostMode, TerritoryLocked};
use crate::model::trust::PermissionSet;
use crate::notify::{Notification, NotificationKind, Severity};
use crate::resolver::{self, Decision};
use crate::session::Session;
use crate::territory;

/// World facts pushed into the engine by the embedder. Each is handled as a
/// pure function of (event, current state); user-visible reactions land in
/// the notification outbox.
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    /// One fixed-rate game tick elapsed.
    Tick,
    DayStarted {
        day: u32,
    },
    DayEnding,
    PlayerJoined {
        id: PlayerId,
        name: String,
        cabin: Option<Tile>,
    },
    PlayerLeft {
        id: PlayerId,
    },
    PlayerMoved {
        player: PlayerId,
        tile: Tile,
    },
    SeedPlanted {
        player: PlayerId,
        tile: Tile,
        seed: String,
        regrows: bool,
    },
    TreePlanted {
        player: PlayerId,
        tile: Tile,
    },
    ObjectPlaced {
        player: PlayerId,
        tile: Tile,
        kind: ObjectKind,
    },
    BuildingPlaced {
        purchaser: PlayerId,
        kind: BuildingKind,
        tile: Tile,
    },
    BuildingRemoved {
        id: ResourceId,
    },
    MachineProduced {
        tile: Tile,
        item: String,
        count: u32,
        unit_value: i64,
    },
    /// Host → follower territory lock, delivered by the message channel.
    LockReplicated(TerritoryLocked),
}

/// Outcome of a harvest attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarvestOutcome {
    Denied { owner: Option<PlayerId> },
    Harvested(ResourceId),
}

/// Version string exchanged in the join handshake. Peers running a
/// different build tag resources differently, so the host warns about them.
pub const PROTOCOL_VERSION: &str = env!("CARGO_PKG_VERSION");

pub struct Engine {
    pub session: Session,
    pub config: EngineConfig,
    authority: bool,
    local_player: PlayerId,
    boundary: BoundaryEnforcer,
    /// Crop owner resolved before harvest output exists; consumed by the
    /// first stack entering a player's holdings.
    pending_harvest: Option<OwnerTag>,
    ticks_since_day_start: u64,
    day_settled: bool,
    outbox: Vec<Notification>,
}

impl Engine {
    /// Engine for the authoritative host process.
    pub fn host(session: Session, config: EngineConfig) -> Self {
        let local = session.roster.host;
        Self::new(session, config, local, true)
    }

    /// Engine for a follower process. Enforcement stays inert until the
    /// host's lock message arrives.
    pub fn follower(session: Session, config: EngineConfig, local_player: PlayerId) -> Self {
        Self::new(session, config, local_player, false)
    }

    fn new(
        mut session: Session,
        config: EngineConfig,
        local_player: PlayerId,
        authority: bool,
    ) -> Self {
        let boundary = BoundaryEnforcer::new(&session.layout, config.denial_cooldown_ticks);
        if authority {
            commons::seed_common_chest(&mut session);
            territory::assign_quadrants(&mut session.territory, &session.roster, &session.layout);
        }
        Self {
            session,
            config,
            authority,
            local_player,
            boundary,
            pending_harvest: None,
            ticks_since_day_start: 0,
            day_settled: false,
            outbox: Vec::new(),
        }
    }

    pub fn is_authority(&self) -> bool {
        self.authority
    }

    pub fn local_player(&self) -> PlayerId {
        self.local_player
    }

    /// Take everything queued for the embedder's notification UI.
    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.outbox)
    }

    /// The lock message to (re-)send to a connecting follower, if locked.
    pub fn lock_message(&self) -> Option<TerritoryLocked> {
        self.session.territory.locked.then_some(TerritoryLocked {
            mode: self.session.territory.mode,
            player_count: self.session.territory.locked_player_count,
        })
    }

    pub fn can_player_join(&self) -> bool {
        territory::can_player_join(&self.session.territory, self.session.roster.online_count())
    }

    /// Join handshake version check, host side. The transport cannot refuse
    /// the connection; a mismatched peer just triggers a warning, since
    /// their process will not replicate tags correctly.
    pub fn check_peer_version(&mut self, peer_name: &str, peer_version: Option<&str>) -> bool {
        match peer_version {
            Some(version) if version == PROTOCOL_VERSION => true,
            Some(version) => {
                tracing::warn!(peer_name, version, host = PROTOCOL_VERSION, "peer version mismatch");
                self.outbox.push(Notification::new(
                    NotificationKind::JoinWarning,
                    Severity::Warn,
                    format!(
                        "Warning: {peer_name} runs version {version}, host runs {PROTOCOL_VERSION}"
                    ),
                ));
                false
            }
            None => {
                tracing::warn!(peer_name, "peer connected without the ownership engine");
                self.outbox.push(Notification::new(
                    NotificationKind::JoinWarning,
                    Severity::Warn,
                    format!("Warning: {peer_name} joined without ownership tracking!"),
                ));
                false
            }
        }
    }

    pub fn available_modes(&self) -> Vec<HostMode> {
        territory::available_modes(self.session.roster.online_count())
    }

    // ------------------------------------------------------------------
    // Event intake
    // ------------------------------------------------------------------

    pub fn handle(&mut self, event: GameEvent) {
        match event {
            GameEvent::Tick => self.on_tick(),
            GameEvent::DayStarted { day } => self.on_day_started(day),
            GameEvent::DayEnding => self.on_day_ending(),
            GameEvent::PlayerJoined { id, name, cabin } => self.on_player_joined(id, name, cabin),
            GameEvent::PlayerLeft { id } => self.on_player_left(id),
            GameEvent::PlayerMoved { player, tile } => {
                self.session.positions.insert(player, tile);
            }
            GameEvent::SeedPlanted {
                player,
                tile,
                seed,
                regrows,
            } => chain::plant(&mut self.session, player, tile, &seed, regrows),
            GameEvent::TreePlanted { player, tile } => {
                // Day-transition churn adds terrain features that nobody
                // planted; ignore them until the settle window passes.
                if self.day_settled {
                    chain::plant_tree(&mut self.session, player, tile);
                }
            }
            GameEvent::ObjectPlaced { player, tile, kind } => {
                self.session.farm.place_object(tile, kind);
                if let Some(object) = self.session.farm.object_at_mut(tile) {
                    object.attrs.set_owner(OwnerTag::Player(player));
                }
            }
            GameEvent::BuildingPlaced {
                purchaser,
                kind,
                tile,
            } => {
                let id = self.session.farm.add_building(kind, tile);
                if let Some(building) = self.session.farm.buildings.get_mut(&id) {
                    building.attrs.set_owner(OwnerTag::Player(purchaser));
                }
                if let Some(building) = self.session.farm.buildings.get(&id) {
                    self.session.pastures.add_building(building, &self.config);
                }
            }
            GameEvent::BuildingRemoved { id } => {
                self.session.farm.buildings.remove(&id);
                self.session.pastures.remove_building(id);
            }
            GameEvent::MachineProduced {
                tile,
                item,
                count,
                unit_value,
            } => chain::machine_produce(&mut self.session, tile, &item, count, unit_value),
            GameEvent::LockReplicated(msg) => self.on_lock_replicated(msg),
        }
    }

    fn on_tick(&mut self) {
        self.session.clock.advance_tick();
        self.boundary.tick_cooldowns();

        if !self.day_settled {
            self.ticks_since_day_start += 1;
            if self.ticks_since_day_start >= self.config.day_settle_ticks {
                self.day_settled = true;
            }
            return;
        }

        let tick = self.session.clock.tick;
        if tick % self.config.boundary_check_interval.max(1) == 0 {
            self.check_boundary();
        }
        if tick % self.config.machine_sweep_interval.max(1) == 0 {
            chain::sweep_machine_outputs(&mut self.session);
        }
    }

    fn check_boundary(&mut self) {
        let player = self.local_player;
        let Some(tile) = self.session.position(player) else {
            return;
        };
        let Some(blocked) =
            self.boundary
                .check(&self.session.territory, &self.session.roster, player, tile)
        else {
            return;
        };
        if let Some(revert) = blocked.revert_to {
            self.session.positions.insert(player, revert);
        }
        if let Some(note) = blocked.notification {
            self.outbox.push(note);
        }
    }

    fn on_day_started(&mut self, day: u32) {
        self.session.clock.day = day;
        self.day_settled = false;
        self.ticks_since_day_start = 0;
        self.pending_harvest = None;

        for (grantor, grantee) in self.session.trust.prune_expired(day) {
            let name = self.session.roster.display_name(grantee).to_string();
            self.outbox.push(Notification::new(
                NotificationKind::TrustExpired { grantor, grantee },
                Severity::Warn,
                format!("{name}'s access has expired"),
            ));
        }
    }

    fn on_day_ending(&mut self) {
        if !self.authority {
            return;
        }
        let notes = commons::end_of_day(&mut self.session, &self.config);
        self.outbox.extend(notes);
    }

    fn on_player_joined(&mut self, id: PlayerId, name: String, cabin: Option<Tile>) {
        let capacity_ok = self.can_player_join();
        self.session.roster.join(id, name, cabin);

        if !capacity_ok {
            let locked_for = self.session.territory.locked_player_count;
            self.outbox.push(Notification::new(
                NotificationKind::JoinWarning,
                Severity::Warn,
                format!("Session was locked for {locked_for} players; the roster is full."),
            ));
        }

        if self.authority && !self.session.territory.locked {
            territory::assign_quadrants(
                &mut self.session.territory,
                &self.session.roster,
                &self.session.layout,
            );
        }
    }

    fn on_player_left(&mut self, id: PlayerId) {
        self.session.roster.leave(id);
        if self.authority && !self.session.territory.locked {
            territory::assign_quadrants(
                &mut self.session.territory,
                &self.session.roster,
                &self.session.layout,
            );
        }
    }

    fn on_lock_replicated(&mut self, msg: TerritoryLocked) {
        if self.authority {
            // Our own broadcast coming back; the lock already happened.
            return;
        }
        let already_locked = self.session.territory.locked;
        territory::apply_lock_message(&mut self.session.territory, msg, self.session.clock.day);
        territory::assign_quadrants(
            &mut self.session.territory,
            &self.session.roster,
            &self.session.layout,
        );
        if !already_locked {
            self.notify_locked(msg);
        }
    }

    // ------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------

    /// Lock the territory state machine. Host-only; one-way.
    pub fn lock_territory(&mut self, mode: HostMode) -> Result<TerritoryLocked, EngineError> {
        if !self.authority {
            return Err(EngineError::NotAuthority {
                action: "lock the territory",
            });
        }
        let players = self.session.roster.online_count();
        let msg = territory::lock(
            &mut self.session.territory,
            mode,
            players,
            self.session.clock.day,
        )?;
        territory::assign_quadrants(
            &mut self.session.territory,
            &self.session.roster,
            &self.session.layout,
        );
        self.notify_locked(msg);
        Ok(msg)
    }

    fn notify_locked(&mut self, msg: TerritoryLocked) {
        let mode_text = match msg.mode {
            HostMode::Private => "Private",
            HostMode::Landlord => "Landlord",
        };
        self.outbox.push(Notification::new(
            NotificationKind::TerritoryLocked {
                mode: msg.mode,
                player_count: msg.player_count,
            },
            Severity::Info,
            format!("{mode_text} mode locked with {} players!", msg.player_count),
        ));
    }

    /// Grant trust from one player to another. `days: None` uses the
    /// configured default; `Some(0)` never expires.
    pub fn grant_trust(
        &mut self,
        grantor: PlayerId,
        grantee: PlayerId,
        days: Option<u32>,
        permissions: PermissionSet,
    ) -> Result<(), EngineError> {
        if !self.session.roster.contains(grantee) {
            return Err(EngineError::invalid_grant("unknown player"));
        }
        let days = days.unwrap_or(self.config.default_trust_days);
        self.session.trust.grant(
            grantor,
            grantee,
            days,
            permissions,
            self.session.clock.day,
        )?;
        let name = self.session.roster.display_name(grantee).to_string();
        let expiry = if days == 0 {
            "until revoked".to_string()
        } else {
            format!("for {days} day(s)")
        };
        self.outbox.push(Notification::new(
            NotificationKind::TrustGranted { grantor, grantee },
            Severity::Info,
            format!("Granted access to {name} {expiry}"),
        ));
        Ok(())
    }

    pub fn revoke_trust(&mut self, grantor: PlayerId, grantee: PlayerId) {
        if self.session.trust.revoke(grantor, grantee) {
            let name = self.session.roster.display_name(grantee).to_string();
            self.outbox.push(Notification::new(
                NotificationKind::TrustRevoked { grantor, grantee },
                Severity::Info,
                format!("Revoked access from {name}"),
            ));
        }
    }

    pub fn grant_chest_access(
        &mut self,
        grantor: PlayerId,
        grantee: PlayerId,
        chest: ResourceId,
    ) -> Result<(), EngineError> {
        if !self.session.roster.contains(grantee) {
            return Err(EngineError::invalid_grant("unknown player"));
        }
        self.session.trust.grant_chest(
            grantor,
            grantee,
            chest,
            0,
            self.session.clock.day,
        )?;
        let name = self.session.roster.display_name(grantee).to_string();
        self.outbox.push(Notification::new(
            NotificationKind::TrustGranted { grantor, grantee },
            Severity::Info,
            format!("Granted {name} access to chest"),
        ));
        Ok(())
    }

    pub fn revoke_chest_access(
        &mut self,
        grantor: PlayerId,
        grantee: PlayerId,
        chest: ResourceId,
    ) {
        if self.session.trust.revoke_chest(grantor, grantee, chest) {
            let name = self.session.roster.display_name(grantee).to_string();
            self.outbox.push(Notification::new(
                NotificationKind::TrustRevoked { grantor, grantee },
                Severity::Info,
                format!("Revoked {name}'s access to chest"),
            ));
        }
    }

    /// Mark or unmark a chest as common storage. Host-only.
    pub fn designate_common_chest(
        &mut self,
        actor: PlayerId,
        tile: Tile,
        common: bool,
    ) -> Result<(), EngineError> {
        if !self.session.roster.is_host(actor) {
            return Err(EngineError::NotAuthority {
                action: "designate common chests",
            });
        }
        if let Some(note) = commons::designate_common_chest(&mut self.session, tile, common) {
            self.outbox.push(note);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Interaction attempts
    // ------------------------------------------------------------------

    /// Harvest the crop at a tile. The crop's owner is resolved before the
    /// output stack exists and rides a pending-owner slot into the item, so
    /// the picker's identity never leaks onto someone else's produce.
    pub fn try_harvest(
        &mut self,
        player: PlayerId,
        tile: Tile,
        item: &str,
        count: u32,
        unit_value: i64,
    ) -> HarvestOutcome {
        let common_tile =
            commons::is_common_tile(&self.session.layout, &self.session.territory, tile);
        if self.config.enforce_crop_ownership && !common_tile {
            let decision = resolver::authorize(
                &self.session.farm,
                &self.session.trust,
                self.session.clock.day,
                player,
                EntityRef::Crop { tile },
                crate::model::trust::PermissionCategory::Crops,
            );
            if let Decision::Denied { owner } = decision {
                self.push_denied(owner, "crop");
                return HarvestOutcome::Denied { owner };
            }
        }

        self.pending_harvest = chain::begin_harvest(&self.session, tile);
        let stack = self.session.farm.new_stack(item, count, unit_value);
        let held = chain::receive_stack(&mut self.session, &mut self.pending_harvest, player, stack);
        chain::finish_harvest(&mut self.session, tile);
        // Cleared regardless of whether a stack consumed it
        self.pending_harvest = None;
        HarvestOutcome::Harvested(held)
    }

    /// An item entered a player's holdings through a non-harvest path
    /// (foraging, fishing, mining, gifts). Tags it to the receiver unless a
    /// harvest is mid-flight.
    pub fn receive_item(
        &mut self,
        player: PlayerId,
        item: &str,
        count: u32,
        unit_value: i64,
    ) -> ResourceId {
        let stack = self.session.farm.new_stack(item, count, unit_value);
        chain::receive_stack(&mut self.session, &mut self.pending_harvest, player, stack)
    }

    /// A destructive tool action against a tagged resource.
    pub fn try_strike(
        &mut self,
        player: PlayerId,
        target: EntityRef,
        destroys: bool,
    ) -> StrikeOutcome {
        let outcome = chain::tool_strike(&mut self.session, &self.config, player, target, destroys);
        if let StrikeOutcome::Denied { owner } = outcome {
            self.push_denied(owner, "resource");
        }
        outcome
    }

    /// Tilling / ground work, checked against pasture zones.
    pub fn try_ground_work(&mut self, player: PlayerId, tile: Tile) -> Decision {
        if !self.config.enforce_pasture_protection {
            return Decision::Allowed;
        }
        let decision = crate::pasture::authorize_ground_work(
            &self.session.pastures,
            &self.session.trust,
            self.session.clock.day,
            player,
            tile,
        );
        if let Decision::Denied { owner } = decision {
            self.push_denied(owner, "pasture");
        }
        decision
    }

    pub fn try_load_machine(
        &mut self,
        player: PlayerId,
        tile: Tile,
        input: ResourceId,
    ) -> Decision {
        let decision = chain::machine_load(&mut self.session, &self.config, player, tile, input);
        if let Decision::Denied { owner } = decision {
            self.push_denied(owner, "machine");
        }
        decision
    }

    pub fn try_collect_output(&mut self, player: PlayerId, tile: Tile) -> CollectOutcome {
        let outcome = chain::collect_output(&mut self.session, &self.config, player, tile);
        if let CollectOutcome::Denied { owner } = outcome {
            self.push_denied(owner, "machine");
        }
        outcome
    }

    pub fn try_open_chest(&mut self, player: PlayerId, tile: Tile) -> Decision {
        if !self.config.enforce_chest_ownership {
            return Decision::Allowed;
        }
        let decision = resolver::authorize_chest(
            &self.session.farm,
            &self.session.trust,
            self.session.clock.day,
            player,
            EntityRef::Object { tile },
        );
        if let Decision::Denied { owner } = decision {
            self.push_denied(owner, "chest");
        }
        decision
    }

    pub fn try_deposit(
        &mut self,
        player: PlayerId,
        chest_tile: Tile,
        stack: ResourceId,
    ) -> DepositOutcome {
        let outcome = commons::deposit(&mut self.session, &self.config, player, chest_tile, stack);
        match outcome {
            DepositOutcome::Denied { owner } => self.push_denied(owner, "chest"),
            DepositOutcome::NotCommonContainer => {
                self.outbox.push(Notification::new(
                    NotificationKind::AccessDenied { owner: None },
                    Severity::Warn,
                    "Common goods can only go into common storage.",
                ));
            }
            DepositOutcome::Deposited | DepositOutcome::NoChest => {}
        }
        outcome
    }

    pub fn try_withdraw(
        &mut self,
        player: PlayerId,
        chest_tile: Tile,
        stack: ResourceId,
    ) -> Decision {
        let decision =
            commons::withdraw(&mut self.session, &self.config, player, chest_tile, stack);
        if let Decision::Denied { owner } = decision {
            self.push_denied(owner, "chest");
        }
        decision
    }

    pub fn try_ship(
        &mut self,
        player: PlayerId,
        quadrant: Quadrant,
        stack: ResourceId,
    ) -> ShipOutcome {
        let outcome = commons::ship(&mut self.session, player, quadrant, stack);
        match outcome {
            ShipOutcome::Denied { owner } => self.push_denied(owner, "item"),
            ShipOutcome::WrongBin => {
                self.outbox.push(Notification::new(
                    NotificationKind::AccessDenied { owner: None },
                    Severity::Warn,
                    "That cannot be shipped from this bin.",
                ));
            }
            ShipOutcome::Shipped => {}
        }
        outcome
    }

    /// Duplicate a stack on behalf of external automation tooling,
    /// preserving its owner tag.
    pub fn clone_stack(&mut self, source: ResourceId) -> Option<ResourceId> {
        chain::clone_stack(&mut self.session, source)
    }

    fn push_denied(&mut self, owner: Option<PlayerId>, what: &str) {
        let message = match owner {
            Some(id) => format!(
                "This {what} belongs to {}",
                self.session.roster.display_name(id)
            ),
            None => format!("This {what} is protected."),
        };
        self.outbox.push(Notification::new(
            NotificationKind::AccessDenied { owner },
            Severity::Warn,
            message,
        ));
    }
}

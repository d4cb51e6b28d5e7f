use crate::asset::{AssetError, AssetLoader, LoadFuture};
use crate::collider::{boundary_colliders, ColliderMap};
use crate::constants::{MAX_DISTANCE, MAX_LOAD_PER_FRAME, MAX_REMOVE_PER_FRAME, ROOM_SIZE};
use crate::maze::MazeTopology;
use crate::object_pool::ObjectPool;
use crate::random::RandomSource;
use crate::room::{ArchetypeId, RoomCatalog, RoomKey, FALLBACK_ROOM};
use crate::room_matcher::match_room;
use crate::scene::{RoomRenderable, SceneGroupId};
use futures::task::noop_waker_ref;
use futures::FutureExt;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::task::{Context, Poll};
use tracing::{debug, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamerConfig {
    pub room_size: f32,
    /// Residency radius in cells.
    pub max_distance: i32,
    pub max_load_per_frame: usize,
    pub max_remove_per_frame: usize,
    /// Opacity of rooms between the camera and the player.
    pub occluded_opacity: f32,
    /// Scene group resident rooms are attached to.
    pub world_group: SceneGroupId,
}

impl Default for StreamerConfig {
    fn default() -> Self {
        StreamerConfig {
            room_size: ROOM_SIZE,
            max_distance: MAX_DISTANCE,
            max_load_per_frame: MAX_LOAD_PER_FRAME,
            max_remove_per_frame: MAX_REMOVE_PER_FRAME,
            occluded_opacity: 0.35,
            world_group: SceneGroupId(0),
        }
    }
}

/// Residency of one grid key, without the instance it may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomStatus {
    PendingLoad,
    Loading,
    Resident,
    PendingUnload,
    /// The fallback load failed too. Not requested again until the key
    /// leaves the radius or the world is reset.
    Failed,
}

#[derive(Debug)]
pub struct RoomInstance<R> {
    pub key: RoomKey,
    pub archetype: ArchetypeId,
    pub node: R,
    pub position: Vector3<f32>,
}

#[derive(Debug)]
enum RoomState<R> {
    PendingLoad,
    Loading,
    Resident(RoomInstance<R>),
    PendingUnload(RoomInstance<R>),
    Failed,
}

impl<R> RoomState<R> {
    fn status(&self) -> RoomStatus {
        match self {
            RoomState::PendingLoad => RoomStatus::PendingLoad,
            RoomState::Loading => RoomStatus::Loading,
            RoomState::Resident(_) => RoomStatus::Resident,
            RoomState::PendingUnload(_) => RoomStatus::PendingUnload,
            RoomState::Failed => RoomStatus::Failed,
        }
    }

    fn instance_mut(&mut self) -> Option<&mut RoomInstance<R>> {
        match self {
            RoomState::Resident(instance) | RoomState::PendingUnload(instance) => Some(instance),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct LoadRequest {
    key: RoomKey,
    archetype: ArchetypeId,
    is_retry: bool,
}

struct InFlightLoad<R> {
    request: LoadRequest,
    epoch: u64,
    future: LoadFuture<R>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamerStats {
    pub resident: usize,
    pub loading: usize,
    pub pending_load: usize,
    pub pending_unload: usize,
    pub failed: usize,
    pub pool_hits: u64,
    pub pool_misses: u64,
    pub load_failures: u64,
    pub retries: u64,
    pub stale_completions: u64,
}

/// Streams maze rooms in and out around the player, a bounded amount of work
/// per tick.
pub struct WorldStreamer<R: RoomRenderable, L: AssetLoader<R>> {
    config: StreamerConfig,
    catalog: RoomCatalog,
    loader: L,
    rng: Box<dyn RandomSource>,
    pool: ObjectPool<R>,
    topology: Option<MazeTopology>,
    rooms: BTreeMap<RoomKey, RoomState<R>>,
    load_queue: VecDeque<LoadRequest>,
    unload_queue: VecDeque<RoomKey>,
    in_flight: Vec<InFlightLoad<R>>,
    archetype_cache: HashMap<RoomKey, ArchetypeId>,
    colliders: ColliderMap,
    last_center: Option<RoomKey>,
    occluders: BTreeSet<RoomKey>,
    epoch: u64,
    stats: StreamerStats,
}

impl<R: RoomRenderable, L: AssetLoader<R>> WorldStreamer<R, L> {
    pub fn new(
        config: StreamerConfig,
        catalog: RoomCatalog,
        loader: L,
        rng: Box<dyn RandomSource>,
    ) -> Self {
        WorldStreamer {
            config,
            catalog,
            loader,
            rng,
            pool: ObjectPool::default(),
            topology: None,
            rooms: BTreeMap::new(),
            load_queue: VecDeque::new(),
            unload_queue: VecDeque::new(),
            in_flight: Vec::new(),
            archetype_cache: HashMap::new(),
            colliders: ColliderMap::default(),
            last_center: None,
            occluders: BTreeSet::new(),
            epoch: 0,
            stats: StreamerStats::default(),
        }
    }

    /// Resets and installs a freshly generated maze.
    pub fn create_world(&mut self, topology: MazeTopology) {
        self.reset();
        self.colliders
            .set_boundary(boundary_colliders(topology.width(), topology.height()));
        self.topology = Some(topology);
    }

    /// Returns every resident room to the pool and forgets all per-level
    /// state. Loads still in flight are dropped; the epoch bump keeps any
    /// completion that was already queued from touching the new world.
    pub fn reset(&mut self) {
        self.epoch += 1;
        self.in_flight.clear();
        for (_, state) in std::mem::take(&mut self.rooms) {
            if let RoomState::Resident(instance) | RoomState::PendingUnload(instance) = state {
                self.pool.release(instance.archetype, instance.node);
            }
        }
        self.topology = None;
        self.load_queue.clear();
        self.unload_queue.clear();
        self.archetype_cache.clear();
        self.colliders.clear();
        self.last_center = None;
        self.occluders.clear();
        self.stats = StreamerStats::default();
    }

    /// Disposes pooled instances and templates.
    pub fn clear_pool(&mut self) {
        self.pool.clear();
    }

    /// One tick of streaming around the player's room coordinate.
    pub fn stream_around(&mut self, room_x: i32, room_z: i32) {
        let center = RoomKey::new(room_x, room_z);
        self.poll_loads();

        if self.last_center != Some(center) {
            self.schedule_unloads(&center);
            self.update_occlusion(&center);
            self.last_center = Some(center);
        }
        self.schedule_loads(&center);

        self.process_unloads();
        self.process_loads();
    }

    fn schedule_unloads(&mut self, center: &RoomKey) {
        let max_distance = self.config.max_distance;
        let mut dropped = Vec::new();
        for (key, state) in self.rooms.iter_mut() {
            if key.distance(center) <= max_distance {
                continue;
            }
            match state {
                RoomState::Resident(_) => {
                    if let RoomState::Resident(instance) =
                        std::mem::replace(state, RoomState::Loading)
                    {
                        *state = RoomState::PendingUnload(instance);
                        self.unload_queue.push_back(*key);
                    }
                }
                RoomState::PendingLoad | RoomState::Failed => dropped.push(*key),
                // in-flight loads finish and are unloaded on arrival
                RoomState::Loading | RoomState::PendingUnload(_) => {}
            }
        }
        if !dropped.is_empty() {
            for key in &dropped {
                self.rooms.remove(key);
            }
            self.load_queue.retain(|request| !dropped.contains(&request.key));
        }
    }

    /// Fades the rooms south, west and south-west of the player, which sit
    /// between it and the oblique camera.
    fn update_occlusion(&mut self, center: &RoomKey) {
        let occluders = occluders_of(center);
        if self.last_center.is_some() && occluders == self.occluders {
            return;
        }
        let faded = self.config.occluded_opacity;
        for (key, state) in self.rooms.iter_mut() {
            if let Some(instance) = state.instance_mut() {
                let opacity = if occluders.contains(key) { faded } else { 1.0 };
                instance.node.set_opacity(opacity);
            }
        }
        self.occluders = occluders;
    }

    fn schedule_loads(&mut self, center: &RoomKey) {
        let Some(topology) = self.topology.as_ref() else {
            return;
        };
        let radius = self.config.max_distance;
        let mut keys = (-radius..=radius)
            .flat_map(|dx| (-radius..=radius).map(move |dz| (dx, dz)))
            .map(|(dx, dz)| RoomKey::new(center.x + dx, center.z + dz))
            .filter(|key| topology.contains(key))
            .collect::<Vec<_>>();
        // nearest ring first so the player's own room is requested first
        keys.sort_by_key(|key| key.distance(center));

        for key in keys {
            match self.rooms.get_mut(&key) {
                Some(state) if matches!(state, RoomState::PendingUnload(_)) => {
                    if let RoomState::PendingUnload(instance) =
                        std::mem::replace(state, RoomState::Loading)
                    {
                        *state = RoomState::Resident(instance);
                    }
                    self.unload_queue.retain(|queued| *queued != key);
                    debug!(%key, "room back in range, unload cancelled");
                }
                Some(_) => {}
                None => {
                    let archetype = self.archetype_for(&key);
                    self.rooms.insert(key, RoomState::PendingLoad);
                    self.load_queue.push_back(LoadRequest {
                        key,
                        archetype,
                        is_retry: false,
                    });
                }
            }
        }
    }

    /// Matched once per key and reused afterwards.
    fn archetype_for(&mut self, key: &RoomKey) -> ArchetypeId {
        if let Some(archetype) = self.archetype_cache.get(key) {
            return *archetype;
        }
        let archetype = match self
            .topology
            .as_ref()
            .and_then(|topology| Some((topology.cell_at(key)?, topology.is_end_cell(key))))
        {
            Some((cell, is_end)) => match_room(&self.catalog, cell, is_end, &mut *self.rng),
            None => FALLBACK_ROOM,
        };
        self.archetype_cache.insert(*key, archetype);
        archetype
    }

    fn process_unloads(&mut self) {
        let mut processed = 0;
        while processed < self.config.max_remove_per_frame {
            let Some(key) = self.unload_queue.pop_front() else {
                break;
            };
            let Some(RoomState::PendingUnload(_)) = self.rooms.get(&key) else {
                continue;
            };
            if let Some(RoomState::PendingUnload(instance)) = self.rooms.remove(&key) {
                self.colliders.remove_room(&key);
                debug!(%key, archetype = %instance.archetype, "room unloaded");
                self.pool.release(instance.archetype, instance.node);
            }
            processed += 1;
        }
    }

    fn process_loads(&mut self) {
        let mut processed = 0;
        while processed < self.config.max_load_per_frame {
            let Some(request) = self.load_queue.pop_front() else {
                break;
            };
            if !matches!(self.rooms.get(&request.key), Some(RoomState::PendingLoad)) {
                continue;
            }
            match self.pool.acquire(&request.archetype) {
                Some(node) => {
                    self.stats.pool_hits += 1;
                    debug!(key = %request.key, archetype = %request.archetype, "pool hit");
                    self.place(request.key, request.archetype, node);
                }
                None => {
                    self.stats.pool_misses += 1;
                    debug!(key = %request.key, archetype = %request.archetype, "loading room asset");
                    self.rooms.insert(request.key, RoomState::Loading);
                    let future = self.loader.load_room_asset(request.archetype);
                    self.in_flight.push(InFlightLoad {
                        request,
                        epoch: self.epoch,
                        future,
                    });
                }
            }
            processed += 1;
        }
    }

    /// Polls every in-flight load once and applies the ones that finished.
    fn poll_loads(&mut self) {
        if self.in_flight.is_empty() {
            return;
        }
        let mut cx = Context::from_waker(noop_waker_ref());
        for mut load in std::mem::take(&mut self.in_flight) {
            match load.future.poll_unpin(&mut cx) {
                Poll::Pending => self.in_flight.push(load),
                Poll::Ready(result) => self.finish_load(load.request, load.epoch, result),
            }
        }
    }

    fn finish_load(&mut self, request: LoadRequest, epoch: u64, result: Result<R, AssetError>) {
        if epoch != self.epoch {
            self.stats.stale_completions += 1;
            debug!(key = %request.key, "discarding load from a previous world");
            return;
        }
        if !matches!(self.rooms.get(&request.key), Some(RoomState::Loading)) {
            return;
        }

        match result {
            Ok(asset) => {
                if self.pool.has_template(&request.archetype) {
                    self.pool.release(request.archetype, asset);
                } else {
                    self.pool.register_template(request.archetype, asset);
                }
                match self.pool.acquire(&request.archetype) {
                    Some(node) => self.place(request.key, request.archetype, node),
                    None => {
                        self.rooms.insert(request.key, RoomState::Failed);
                    }
                }
            }
            Err(error) => {
                self.stats.load_failures += 1;
                if !request.is_retry && request.archetype != FALLBACK_ROOM {
                    warn!(
                        key = %request.key,
                        archetype = %request.archetype,
                        %error,
                        "room load failed, retrying with fallback"
                    );
                    self.stats.retries += 1;
                    self.rooms.insert(request.key, RoomState::PendingLoad);
                    self.load_queue.push_back(LoadRequest {
                        key: request.key,
                        archetype: FALLBACK_ROOM,
                        is_retry: true,
                    });
                } else {
                    warn!(key = %request.key, archetype = %request.archetype, %error, "room load failed");
                    self.rooms.insert(request.key, RoomState::Failed);
                }
            }
        }
    }

    fn place(&mut self, key: RoomKey, archetype: ArchetypeId, mut node: R) {
        let position = key.world_origin(self.config.room_size);
        node.set_position(position);
        node.reparent(Some(self.config.world_group));
        node.set_visible(true);
        node.set_opacity(if self.occluders.contains(&key) {
            self.config.occluded_opacity
        } else {
            1.0
        });
        let colliders = self
            .catalog
            .get(&archetype)
            .map(|room| room.world_colliders(&position))
            .unwrap_or_default();
        self.colliders.insert_room(key, colliders);
        debug!(%key, %archetype, "room placed");

        let instance = RoomInstance {
            key,
            archetype,
            node,
            position,
        };
        let out_of_range = self
            .last_center
            .is_some_and(|center| key.distance(&center) > self.config.max_distance);
        if out_of_range {
            self.rooms.insert(key, RoomState::PendingUnload(instance));
            self.unload_queue.push_back(key);
        } else {
            self.rooms.insert(key, RoomState::Resident(instance));
        }
    }

    pub fn config(&self) -> &StreamerConfig {
        &self.config
    }

    pub fn topology(&self) -> Option<&MazeTopology> {
        self.topology.as_ref()
    }

    pub fn colliders(&self) -> &ColliderMap {
        &self.colliders
    }

    pub fn status(&self, key: &RoomKey) -> Option<RoomStatus> {
        self.rooms.get(key).map(RoomState::status)
    }

    pub fn is_resident(&self, key: &RoomKey) -> bool {
        matches!(self.status(key), Some(RoomStatus::Resident))
    }

    pub fn instance(&self, key: &RoomKey) -> Option<&RoomInstance<R>> {
        match self.rooms.get(key)? {
            RoomState::Resident(instance) | RoomState::PendingUnload(instance) => Some(instance),
            _ => None,
        }
    }

    pub fn resident_keys(&self) -> Vec<RoomKey> {
        self.rooms
            .iter()
            .filter(|(_, state)| matches!(state, RoomState::Resident(_)))
            .map(|(key, _)| *key)
            .collect()
    }

    /// Archetype the matcher chose for `key`. After a fallback retry the
    /// placed instance's `archetype` is the fallback instead.
    pub fn matched_archetype(&self, key: &RoomKey) -> Option<ArchetypeId> {
        self.archetype_cache.get(key).copied()
    }

    pub fn pending_load_keys(&self) -> Vec<RoomKey> {
        self.load_queue.iter().map(|request| request.key).collect()
    }

    pub fn pending_unload_keys(&self) -> Vec<RoomKey> {
        self.unload_queue.iter().copied().collect()
    }

    pub fn occluded_keys(&self) -> &BTreeSet<RoomKey> {
        &self.occluders
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    pub fn loader_mut(&mut self) -> &mut L {
        &mut self.loader
    }

    pub fn pool(&self) -> &ObjectPool<R> {
        &self.pool
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn stats(&self) -> StreamerStats {
        let mut stats = self.stats;
        stats.resident = 0;
        stats.loading = 0;
        stats.pending_load = 0;
        stats.pending_unload = 0;
        stats.failed = 0;
        for state in self.rooms.values() {
            match state.status() {
                RoomStatus::Resident => stats.resident += 1,
                RoomStatus::Loading => stats.loading += 1,
                RoomStatus::PendingLoad => stats.pending_load += 1,
                RoomStatus::PendingUnload => stats.pending_unload += 1,
                RoomStatus::Failed => stats.failed += 1,
            }
        }
        stats
    }
}

fn occluders_of(center: &RoomKey) -> BTreeSet<RoomKey> {
    [
        RoomKey::new(center.x, center.z + 1),
        RoomKey::new(center.x - 1, center.z),
        RoomKey::new(center.x - 1, center.z + 1),
    ]
    .into_iter()
    .collect()
}

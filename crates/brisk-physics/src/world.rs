//! Physics world
//!
//! [`PhysicsWorld`] owns everything the collision layer needs: entity
//! transforms, colliders, the spatial hash, trigger listeners and arcade
//! rigidbodies. Movers and controllers borrow it mutably for the duration of
//! a call; nothing is global.
//!
//! Transform changes do not touch the spatial hash directly. The collider is
//! marked dirty and queued, and the queue is drained before the next query,
//! so a collider moved several times in one tick is rehashed once.

use ahash::{AHashMap, RandomState};
use brisk_core::{Entity, Ray2D, RectangleF, Transform2D, TransformComponent, Vec2};
use indexmap::{IndexMap, IndexSet};
use log::{debug, warn};

use crate::arena::Arena;
use crate::collider::{Collider, ColliderId, ColliderShape};
use crate::config::{ColliderConfig, LayerMask, PhysicsConfig};
use crate::error::{PhysicsError, PhysicsResult};
use crate::results::{CollisionResult, RaycastHit};
use crate::rigidbody::ArcadeRigidbody;
use crate::shapes::{BoundsContext, Polygon, Shape};
use crate::spatial_hash::{LinecastMode, SpatialHash};
use crate::triggers::{TriggerListener, TriggerPair};

#[derive(Debug, Clone)]
struct EntityRecord {
    transform: Transform2D,
    in_scene: bool,
    collider: Option<ColliderId>,
    /// Bounds of whatever draws the entity, used to auto-size colliders
    visual_bounds: Option<RectangleF>,
}

/// Which pooled shape an overlap query tests against
#[derive(Debug, Clone, Copy)]
enum Probe {
    Box,
    Circle,
}

pub struct PhysicsWorld {
    config: PhysicsConfig,
    entities: Arena<Entity, EntityRecord>,
    colliders: Arena<ColliderId, Collider>,
    spatial_hash: SpatialHash,
    /// Registered colliders whose transform changed since the last query
    pending_updates: IndexSet<ColliderId, RandomState>,
    listeners: AHashMap<Entity, Vec<Box<dyn TriggerListener>>>,
    pub(crate) rigidbodies: IndexMap<Entity, ArcadeRigidbody, RandomState>,
    broadphase_buffer: Vec<ColliderId>,
    overlap_test_box: Shape,
    overlap_test_circle: Shape,
}

impl PhysicsWorld {
    pub fn new(config: PhysicsConfig) -> Self {
        Self {
            spatial_hash: SpatialHash::new(config.spatial_hash_cell_size),
            config,
            entities: Arena::new(),
            colliders: Arena::new(),
            pending_updates: IndexSet::default(),
            listeners: AHashMap::new(),
            rigidbodies: IndexMap::default(),
            broadphase_buffer: Vec::new(),
            overlap_test_box: Shape::rectangle(0.0, 0.0),
            overlap_test_circle: Shape::circle(0.0),
        }
    }

    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    pub fn gravity(&self) -> Vec2 {
        self.config.gravity
    }

    pub fn set_gravity(&mut self, gravity: Vec2) {
        self.config.gravity = gravity;
    }

    pub fn spatial_hash(&self) -> &SpatialHash {
        &self.spatial_hash
    }

    // ---------------------------------------------------------------------
    // Entities
    // ---------------------------------------------------------------------

    /// Create an entity that is already part of the scene
    pub fn create_entity(&mut self, transform: Transform2D) -> Entity {
        self.entities.insert(EntityRecord {
            transform,
            in_scene: true,
            collider: None,
            visual_bounds: None,
        })
    }

    /// Remove an entity together with its collider, rigidbody and listeners
    pub fn destroy_entity(&mut self, entity: Entity) -> PhysicsResult<()> {
        if !self.entities.contains(entity) {
            return Err(PhysicsError::UnknownEntity(entity));
        }

        self.remove_collider(entity)?;
        self.rigidbodies.shift_remove(&entity);
        self.listeners.remove(&entity);
        self.entities.remove(entity);
        debug!("Destroyed entity {:?}", entity);
        Ok(())
    }

    pub fn contains_entity(&self, entity: Entity) -> bool {
        self.entities.contains(entity)
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    fn record(&self, entity: Entity) -> PhysicsResult<&EntityRecord> {
        self.entities.get(entity).ok_or(PhysicsError::UnknownEntity(entity))
    }

    fn record_mut(&mut self, entity: Entity) -> PhysicsResult<&mut EntityRecord> {
        self.entities
            .get_mut(entity)
            .ok_or(PhysicsError::UnknownEntity(entity))
    }

    pub fn transform(&self, entity: Entity) -> PhysicsResult<Transform2D> {
        Ok(self.record(entity)?.transform)
    }

    pub fn position(&self, entity: Entity) -> PhysicsResult<Vec2> {
        Ok(self.record(entity)?.transform.position)
    }

    pub fn set_position(&mut self, entity: Entity, position: Vec2) -> PhysicsResult<()> {
        let record = self.record_mut(entity)?;
        if record.transform.position == position {
            return Ok(());
        }
        record.transform.position = position;
        self.on_entity_transform_changed(entity, TransformComponent::Position)
    }

    pub fn translate(&mut self, entity: Entity, delta: Vec2) -> PhysicsResult<()> {
        let position = self.position(entity)? + delta;
        self.set_position(entity, position)
    }

    /// Set rotation in radians
    pub fn set_rotation(&mut self, entity: Entity, rotation: f32) -> PhysicsResult<()> {
        let record = self.record_mut(entity)?;
        if record.transform.rotation == rotation {
            return Ok(());
        }
        record.transform.rotation = rotation;
        self.on_entity_transform_changed(entity, TransformComponent::Rotation)
    }

    pub fn set_scale(&mut self, entity: Entity, scale: Vec2) -> PhysicsResult<()> {
        let record = self.record_mut(entity)?;
        if record.transform.scale == scale {
            return Ok(());
        }
        record.transform.scale = scale;
        self.on_entity_transform_changed(entity, TransformComponent::Scale)
    }

    /// Hook for transform providers: marks the entity's collider dirty and
    /// queues it for rehashing
    pub fn on_entity_transform_changed(
        &mut self,
        entity: Entity,
        component: TransformComponent,
    ) -> PhysicsResult<()> {
        let Some(id) = self.record(entity)?.collider else {
            return Ok(());
        };
        if let Some(collider) = self.colliders.get_mut(id) {
            collider.on_entity_transform_changed(component);
            if collider.is_registered() {
                self.pending_updates.insert(id);
            }
        }
        Ok(())
    }

    /// Bounds of the entity's visuals, used by auto-sized colliders
    pub fn set_visual_bounds(&mut self, entity: Entity, bounds: Option<RectangleF>) -> PhysicsResult<()> {
        self.record_mut(entity)?.visual_bounds = bounds;
        Ok(())
    }

    /// Add the entity to or remove it from the scene. Only colliders of
    /// entities in the scene are registered with the spatial hash.
    pub fn set_in_scene(&mut self, entity: Entity, in_scene: bool) -> PhysicsResult<()> {
        let record = self.record_mut(entity)?;
        record.in_scene = in_scene;
        let collider = record.collider;
        if let Some(id) = collider {
            self.sync_registration(id);
        }
        Ok(())
    }

    pub fn is_in_scene(&self, entity: Entity) -> PhysicsResult<bool> {
        Ok(self.record(entity)?.in_scene)
    }

    // ---------------------------------------------------------------------
    // Colliders
    // ---------------------------------------------------------------------

    /// Attach a collider to an entity. An entity owns at most one collider.
    pub fn add_collider(
        &mut self,
        entity: Entity,
        shape: ColliderShape,
        config: ColliderConfig,
    ) -> PhysicsResult<ColliderId> {
        let record = self.record(entity)?;
        if let Some(existing) = record.collider {
            return Err(PhysicsError::ColliderAlreadyAttached { entity, existing });
        }

        let mut config = config;
        let shape = match shape {
            ColliderShape::Box { width, height } => Shape::rectangle(width, height),
            ColliderShape::Circle { radius } => Shape::circle(radius),
            ColliderShape::Polygon { mut points } => {
                if points.len() < 3 {
                    return Err(PhysicsError::DegeneratePolygon(points.len()));
                }
                // Rotation happens around the polygon's own center
                let center = Polygon::find_polygon_center(&points);
                Polygon::recenter_polygon_verts(&mut points);
                config.local_offset += center;
                Shape::polygon(points)
            }
            ColliderShape::AutoBox => {
                let (size, offset) = Self::auto_size(entity, record)?;
                config.local_offset = offset;
                Shape::rectangle(size.x, size.y)
            }
            ColliderShape::AutoCircle => {
                let (size, offset) = Self::auto_size(entity, record)?;
                config.local_offset = offset;
                Shape::circle(size.x.max(size.y) * 0.5)
            }
        };

        let id = self
            .colliders
            .insert_with(|id| Collider::new(id, entity, shape, &config));
        self.record_mut(entity)?.collider = Some(id);
        debug!("Attached collider {:?} to entity {:?}", id, entity);

        self.sync_registration(id);
        Ok(id)
    }

    /// Unscaled size and local offset taken from the entity's visual bounds
    fn auto_size(entity: Entity, record: &EntityRecord) -> PhysicsResult<(Vec2, Vec2)> {
        let bounds = record
            .visual_bounds
            .ok_or(PhysicsError::CannotAutoSize(entity))?;
        let scale = record.transform.scale;
        let unscale = |value: f32, factor: f32| if factor != 0.0 { value / factor } else { value };

        let size = Vec2::new(unscale(bounds.width, scale.x), unscale(bounds.height, scale.y));
        let offset = bounds.center() - record.transform.position;
        Ok((size, offset))
    }

    /// Detach and drop the entity's collider, if it has one
    pub fn remove_collider(&mut self, entity: Entity) -> PhysicsResult<Option<ColliderId>> {
        let Some(id) = self.record_mut(entity)?.collider.take() else {
            return Ok(None);
        };

        if self.colliders.get(id).is_some_and(Collider::is_registered) {
            self.unregister_collider(id)?;
        }
        self.pending_updates.shift_remove(&id);
        self.colliders.remove(id);
        debug!("Removed collider {:?} from entity {:?}", id, entity);
        Ok(Some(id))
    }

    pub fn collider(&self, id: ColliderId) -> Option<&Collider> {
        self.colliders.get(id)
    }

    pub fn collider_of(&self, entity: Entity) -> Option<ColliderId> {
        self.entities.get(entity).and_then(|record| record.collider)
    }

    pub fn colliders(&self) -> impl Iterator<Item = (ColliderId, &Collider)> {
        self.colliders.iter()
    }

    pub fn collider_count(&self) -> usize {
        self.colliders.len()
    }

    fn collider_ref(&self, id: ColliderId) -> PhysicsResult<&Collider> {
        self.colliders.get(id).ok_or(PhysicsError::UnknownCollider(id))
    }

    fn collider_mut(&mut self, id: ColliderId) -> PhysicsResult<&mut Collider> {
        self.colliders
            .get_mut(id)
            .ok_or(PhysicsError::UnknownCollider(id))
    }

    /// Current world-space bounds, recalculated if the collider is dirty
    pub fn collider_bounds(&mut self, id: ColliderId) -> PhysicsResult<RectangleF> {
        let collider = self
            .colliders
            .get_mut(id)
            .ok_or(PhysicsError::UnknownCollider(id))?;
        let transform = self
            .entities
            .get(collider.entity())
            .map(|record| record.transform)
            .ok_or(PhysicsError::UnknownEntity(collider.entity()))?;
        Ok(collider.bounds(&transform))
    }

    /// Queue a registered collider for rehashing after a change to its shape
    /// or offset
    fn queue_update(&mut self, id: ColliderId) {
        if self
            .colliders
            .get(id)
            .is_some_and(|collider| collider.is_registered())
        {
            self.pending_updates.insert(id);
        }
    }

    /// Enabling a collider registers it (if its entity is in the scene);
    /// disabling unregisters it
    pub fn set_collider_enabled(&mut self, id: ColliderId, enabled: bool) -> PhysicsResult<()> {
        self.collider_mut(id)?.set_enabled(enabled);
        self.sync_registration(id);
        Ok(())
    }

    pub fn set_local_offset(&mut self, id: ColliderId, offset: Vec2) -> PhysicsResult<()> {
        self.collider_mut(id)?.set_local_offset(offset);
        self.queue_update(id);
        Ok(())
    }

    pub fn set_physics_layer(&mut self, id: ColliderId, layer: u32) -> PhysicsResult<()> {
        self.collider_mut(id)?.set_physics_layer(layer);
        Ok(())
    }

    pub fn set_collides_with_layers(&mut self, id: ColliderId, mask: LayerMask) -> PhysicsResult<()> {
        self.collider_mut(id)?.set_collides_with_layers(mask);
        Ok(())
    }

    pub fn set_is_trigger(&mut self, id: ColliderId, is_trigger: bool) -> PhysicsResult<()> {
        self.collider_mut(id)?.set_is_trigger(is_trigger);
        Ok(())
    }

    pub fn set_cast_sort_order(&mut self, id: ColliderId, order: i32) -> PhysicsResult<()> {
        self.collider_mut(id)?.set_cast_sort_order(order);
        Ok(())
    }

    /// Resize a box collider. Returns `false` if the collider is not a box.
    pub fn update_box(&mut self, id: ColliderId, width: f32, height: f32) -> PhysicsResult<bool> {
        let resized = self.collider_mut(id)?.update_box(width, height);
        self.queue_update(id);
        Ok(resized)
    }

    /// Change a circle collider's radius. Returns `false` if the collider is
    /// not a circle.
    pub fn set_radius(&mut self, id: ColliderId, radius: f32) -> PhysicsResult<bool> {
        let changed = self.collider_mut(id)?.set_radius(radius);
        self.queue_update(id);
        Ok(changed)
    }

    // ---------------------------------------------------------------------
    // Spatial hash registration
    // ---------------------------------------------------------------------

    fn sync_registration(&mut self, id: ColliderId) {
        let Some(collider) = self.colliders.get(id) else {
            return;
        };
        let in_scene = self
            .entities
            .get(collider.entity())
            .is_some_and(|record| record.in_scene);
        let should_register = in_scene && collider.enabled();

        let result = match (should_register, collider.is_registered()) {
            (true, false) => self.register_collider(id),
            (false, true) => self.unregister_collider(id),
            _ => Ok(()),
        };
        if let Err(err) = result {
            warn!("Could not sync registration of {:?}: {}", id, err);
        }
    }

    /// Insert the collider into the spatial hash at its current bounds.
    /// Registering an already registered collider rehashes it.
    pub fn register_collider(&mut self, id: ColliderId) -> PhysicsResult<()> {
        if self.collider_ref(id)?.is_registered() {
            return self.update_collider(id);
        }

        let bounds = self.collider_bounds(id)?;
        self.spatial_hash.register(id, &bounds);
        self.collider_mut(id)?.set_registered_physics_bounds(Some(bounds));
        debug!("Registered collider {:?} at {:?}", id, bounds);
        Ok(())
    }

    /// Remove the collider from the cells it was registered in. Unregistered
    /// colliders are left alone.
    pub fn unregister_collider(&mut self, id: ColliderId) -> PhysicsResult<()> {
        let collider = self.collider_mut(id)?;
        let Some(bounds) = collider.registered_physics_bounds() else {
            warn!("Tried to unregister collider {:?} which is not registered", id);
            return Ok(());
        };
        collider.set_registered_physics_bounds(None);

        self.spatial_hash.remove(id, &bounds);
        self.pending_updates.shift_remove(&id);
        debug!("Unregistered collider {:?}", id);
        Ok(())
    }

    /// Move a registered collider to the cells of its current bounds
    pub fn update_collider(&mut self, id: ColliderId) -> PhysicsResult<()> {
        let Some(old_bounds) = self.collider_ref(id)?.registered_physics_bounds() else {
            return Ok(());
        };

        let bounds = self.collider_bounds(id)?;
        if bounds != old_bounds {
            self.spatial_hash.remove(id, &old_bounds);
            self.spatial_hash.register(id, &bounds);
            self.collider_mut(id)?.set_registered_physics_bounds(Some(bounds));
        }
        Ok(())
    }

    /// Rehash every collider whose transform changed since the last query
    pub fn flush_pending_updates(&mut self) {
        while let Some(id) = self.pending_updates.pop() {
            if let Err(err) = self.update_collider(id) {
                warn!("Dropping stale update for {:?}: {}", id, err);
            }
        }
    }

    /// Empty the spatial hash. Colliders stay attached but unregistered.
    pub fn clear(&mut self) {
        self.spatial_hash.clear();
        self.pending_updates.clear();
        let ids: Vec<ColliderId> = self.colliders.keys().collect();
        for id in ids {
            if let Some(collider) = self.colliders.get_mut(id) {
                collider.set_registered_physics_bounds(None);
            }
        }
        debug!("Cleared spatial hash");
    }

    // ---------------------------------------------------------------------
    // Collider pair tests
    // ---------------------------------------------------------------------

    pub fn overlaps(&mut self, a: ColliderId, b: ColliderId) -> PhysicsResult<bool> {
        self.collider_bounds(a)?;
        self.collider_bounds(b)?;
        Ok(self.collider_ref(a)?.overlaps(self.collider_ref(b)?))
    }

    /// Narrow-phase test at current positions. The result's MTV separates `a`
    /// from `b`.
    pub fn collides_with(&mut self, a: ColliderId, b: ColliderId) -> PhysicsResult<Option<CollisionResult>> {
        self.collider_bounds(a)?;
        self.collider_bounds(b)?;
        Ok(self.collider_ref(a)?.collides_with(self.collider_ref(b)?))
    }

    /// Test as if `a` had moved by `motion`, without moving it
    pub fn will_collide_with(
        &mut self,
        a: ColliderId,
        b: ColliderId,
        motion: Vec2,
    ) -> PhysicsResult<Option<CollisionResult>> {
        self.collider_bounds(a)?;
        self.collider_bounds(b)?;
        match self.colliders.get2_mut(a, b) {
            Some((first, second)) => Ok(first.will_collide_with(second, motion)),
            None => Ok(None),
        }
    }

    /// First non-trigger neighbor overlapping the collider where it stands
    pub fn collides_with_any(&mut self, id: ColliderId) -> PhysicsResult<Option<CollisionResult>> {
        let bounds = self.collider_bounds(id)?;
        let mask = self.collider_ref(id)?.collides_with_layers();
        let neighbors = self.take_broadphase(&bounds, Some(id), mask);

        let mut found = None;
        for &neighbor in &neighbors {
            if self.collider(neighbor).is_none_or(Collider::is_trigger) {
                continue;
            }
            if let Some(result) = self.collides_with(id, neighbor)? {
                found = Some(result);
                break;
            }
        }

        self.recycle_broadphase(neighbors);
        Ok(found)
    }

    /// Sweep the collider by `motion` against its non-trigger neighbors.
    /// Each hit backs `motion` off by its MTV, so touching several colliders
    /// at once backs off from all of them. Returns the last hit.
    pub fn will_collide_with_any(
        &mut self,
        id: ColliderId,
        motion: &mut Vec2,
    ) -> PhysicsResult<Option<CollisionResult>> {
        let bounds = self.collider_bounds(id)?;
        let mask = self.collider_ref(id)?.collides_with_layers();
        let neighbors = self.take_broadphase(&bounds.swept_broadphase_bounds(*motion), Some(id), mask);

        let mut last = None;
        for &neighbor in &neighbors {
            if self.collider(neighbor).is_none_or(Collider::is_trigger) {
                continue;
            }
            if let Some(result) = self.will_collide_with(id, neighbor, *motion)? {
                *motion -= result.minimum_translation_vector;
                last = Some(result);
            }
        }

        self.recycle_broadphase(neighbors);
        Ok(last)
    }

    // ---------------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------------

    fn broadphase_into(
        &mut self,
        bounds: &RectangleF,
        exclude: Option<ColliderId>,
        layer_mask: LayerMask,
        results: &mut Vec<ColliderId>,
    ) {
        self.flush_pending_updates();

        let colliders = &mut self.colliders;
        let entities = &self.entities;
        self.spatial_hash.aabb_broadphase(bounds, exclude, results, |id| {
            let Some(collider) = colliders.get_mut(id) else {
                return false;
            };
            let Some(record) = entities.get(collider.entity()) else {
                return false;
            };
            collider.is_on_layer(layer_mask) && bounds.intersects(&collider.bounds(&record.transform))
        });
    }

    /// Borrow the scratch broadphase buffer filled with a query's results.
    /// Hand it back with [`PhysicsWorld::recycle_broadphase`].
    pub(crate) fn take_broadphase(
        &mut self,
        bounds: &RectangleF,
        exclude: Option<ColliderId>,
        layer_mask: LayerMask,
    ) -> Vec<ColliderId> {
        let mut results = std::mem::take(&mut self.broadphase_buffer);
        results.clear();
        self.broadphase_into(bounds, exclude, layer_mask, &mut results);
        results
    }

    pub(crate) fn recycle_broadphase(&mut self, buffer: Vec<ColliderId>) {
        self.broadphase_buffer = buffer;
    }

    /// Colliders whose bounds intersect `bounds` on a layer in `layer_mask`,
    /// each listed once. The slice is only valid until the next query.
    pub fn aabb_broadphase(
        &mut self,
        bounds: &RectangleF,
        exclude: Option<ColliderId>,
        layer_mask: LayerMask,
    ) -> &[ColliderId] {
        let mut results = std::mem::take(&mut self.broadphase_buffer);
        results.clear();
        self.broadphase_into(bounds, exclude, layer_mask, &mut results);
        self.broadphase_buffer = results;
        &self.broadphase_buffer
    }

    pub fn boxcast_broadphase(&mut self, rect: &RectangleF, layer_mask: LayerMask) -> &[ColliderId] {
        self.aabb_broadphase(rect, None, layer_mask)
    }

    pub fn boxcast_broadphase_excluding_self(
        &mut self,
        id: ColliderId,
        rect: &RectangleF,
        layer_mask: LayerMask,
    ) -> &[ColliderId] {
        self.aabb_broadphase(rect, Some(id), layer_mask)
    }

    /// Closest hit along `start -> end`, ties going to the lower cast sort
    /// order. Colliders in `ignored` are skipped.
    pub fn linecast(
        &mut self,
        start: Vec2,
        end: Vec2,
        layer_mask: LayerMask,
        ignored: &[ColliderId],
    ) -> Option<RaycastHit> {
        let mut hits = Vec::with_capacity(1);
        self.linecast_into(start, end, layer_mask, ignored, LinecastMode::Closest, &mut hits);
        hits.pop()
    }

    /// Every hit along `start -> end`, nearest first, up to `capacity`.
    /// `hits` is cleared first. Returns the number of hits written.
    pub fn linecast_all(
        &mut self,
        start: Vec2,
        end: Vec2,
        hits: &mut Vec<RaycastHit>,
        capacity: usize,
        layer_mask: LayerMask,
    ) -> usize {
        hits.clear();
        self.linecast_into(start, end, layer_mask, &[], LinecastMode::All, hits);
        hits.truncate(capacity);
        hits.len()
    }

    fn linecast_into(
        &mut self,
        start: Vec2,
        end: Vec2,
        layer_mask: LayerMask,
        ignored: &[ColliderId],
        mode: LinecastMode,
        hits: &mut Vec<RaycastHit>,
    ) {
        self.flush_pending_updates();

        let config = &self.config;
        let colliders = &mut self.colliders;
        let entities = &self.entities;
        let ray = Ray2D::new(start, end);

        let capped = self.spatial_hash.linecast(
            start,
            end,
            config.linecast_max_steps,
            mode,
            hits,
            |id| {
                if ignored.contains(&id) {
                    return None;
                }
                let collider = colliders.get_mut(id)?;
                if collider.is_trigger() && !config.raycasts_hit_triggers {
                    return None;
                }
                if !collider.is_on_layer(layer_mask) {
                    return None;
                }

                let transform = entities.get(collider.entity())?.transform;
                let bounds = collider.bounds(&transform);
                if bounds.ray_intersects(&ray).is_none_or(|fraction| fraction > 1.0) {
                    return None;
                }

                if !config.raycasts_start_in_colliders && collider.shape().contains_point(start) {
                    return None;
                }

                let mut hit = collider.shape().collides_with_line(start, end)?;
                hit.collider = Some(id);
                Some((hit, collider.cast_sort_order()))
            },
        );

        if capped {
            warn!(
                "Linecast from {:?} to {:?} stopped after {} cells",
                start, end, config.linecast_max_steps
            );
        }
    }

    fn place_overlap_box(&mut self, rect: &RectangleF) {
        if let Shape::Box(shape) = &mut self.overlap_test_box {
            shape.update_box(rect.width, rect.height);
        }
        self.overlap_test_box.recalculate_bounds(&BoundsContext {
            transform: Transform2D::from_position(rect.center()),
            local_offset: Vec2::ZERO,
            scale_and_rotate: true,
        });
    }

    fn place_overlap_circle(&mut self, center: Vec2, radius: f32) {
        if let Shape::Circle(circle) = &mut self.overlap_test_circle {
            circle.set_radius(radius);
        }
        self.overlap_test_circle.recalculate_bounds(&BoundsContext {
            transform: Transform2D::from_position(center),
            local_offset: Vec2::ZERO,
            scale_and_rotate: true,
        });
    }

    /// Broadphase candidates that also pass a narrow-phase test against the
    /// placed probe shape, written into `results` until `capacity` is reached
    fn overlap_probe(
        &mut self,
        bounds: &RectangleF,
        probe: Probe,
        layer_mask: LayerMask,
        results: &mut Vec<ColliderId>,
        capacity: usize,
    ) {
        let candidates = self.take_broadphase(bounds, None, layer_mask);
        let probe = match probe {
            Probe::Box => &self.overlap_test_box,
            Probe::Circle => &self.overlap_test_circle,
        };

        for &id in &candidates {
            if results.len() >= capacity {
                break;
            }
            if self
                .colliders
                .get(id)
                .is_some_and(|collider| collider.overlaps_shape(probe))
            {
                results.push(id);
            }
        }
        self.recycle_broadphase(candidates);
    }

    /// Any collider overlapping `rect`
    pub fn overlap_rectangle(&mut self, rect: &RectangleF, layer_mask: LayerMask) -> Option<ColliderId> {
        let mut results = Vec::with_capacity(1);
        self.overlap_rectangle_all(rect, &mut results, 1, layer_mask);
        results.pop()
    }

    /// Colliders overlapping `rect`, up to `capacity`. `results` is cleared
    /// first. Returns the number written.
    pub fn overlap_rectangle_all(
        &mut self,
        rect: &RectangleF,
        results: &mut Vec<ColliderId>,
        capacity: usize,
        layer_mask: LayerMask,
    ) -> usize {
        results.clear();
        self.place_overlap_box(rect);
        self.overlap_probe(rect, Probe::Box, layer_mask, results, capacity);
        results.len()
    }

    /// Any collider overlapping the circle
    pub fn overlap_circle(&mut self, center: Vec2, radius: f32, layer_mask: LayerMask) -> Option<ColliderId> {
        let mut results = Vec::with_capacity(1);
        self.overlap_circle_all(center, radius, &mut results, 1, layer_mask);
        results.pop()
    }

    /// Colliders overlapping the circle, up to `capacity`. `results` is
    /// cleared first. Returns the number written.
    pub fn overlap_circle_all(
        &mut self,
        center: Vec2,
        radius: f32,
        results: &mut Vec<ColliderId>,
        capacity: usize,
        layer_mask: LayerMask,
    ) -> usize {
        results.clear();
        self.place_overlap_circle(center, radius);
        let bounds = self.overlap_test_circle.bounds();
        self.overlap_probe(&bounds, Probe::Circle, layer_mask, results, capacity);
        results.len()
    }

    /// First collider containing `point`
    pub fn collider_at_point(&mut self, point: Vec2, layer_mask: LayerMask) -> Option<ColliderId> {
        let bounds = RectangleF::new(point.x - 1.0, point.y - 1.0, 2.0, 2.0);
        let candidates = self.take_broadphase(&bounds, None, layer_mask);
        let found = candidates.iter().copied().find(|id| {
            self.colliders
                .get(*id)
                .is_some_and(|collider| collider.shape().contains_point(point))
        });
        self.recycle_broadphase(candidates);
        found
    }

    // ---------------------------------------------------------------------
    // Trigger listeners
    // ---------------------------------------------------------------------

    pub fn add_trigger_listener(
        &mut self,
        entity: Entity,
        listener: impl TriggerListener + 'static,
    ) -> PhysicsResult<()> {
        self.record(entity)?;
        self.listeners
            .entry(entity)
            .or_default()
            .push(Box::new(listener));
        Ok(())
    }

    pub fn clear_trigger_listeners(&mut self, entity: Entity) {
        self.listeners.remove(&entity);
    }

    /// Tell both sides of a pair about an enter or exit. A side whose
    /// collider is gone is skipped.
    pub(crate) fn notify_trigger_listeners(&mut self, pair: TriggerPair, entering: bool) {
        tracing::trace!(?pair, entering, "trigger");
        self.notify_side(pair.local, pair.other, entering);
        self.notify_side(pair.other, pair.local, entering);
    }

    /// Call `local`'s entity listeners about `other`
    pub(crate) fn notify_side(&mut self, local: ColliderId, other: ColliderId, entering: bool) {
        let Some(entity) = self.colliders.get(local).map(Collider::entity) else {
            return;
        };
        let Some(listeners) = self.listeners.get_mut(&entity) else {
            return;
        };

        for listener in listeners.iter_mut() {
            if entering {
                listener.on_trigger_enter(other, local);
            } else {
                listener.on_trigger_exit(other, local);
            }
        }
    }

    // ---------------------------------------------------------------------
    // Rigidbodies
    // ---------------------------------------------------------------------

    pub fn add_rigidbody(&mut self, entity: Entity, body: ArcadeRigidbody) -> PhysicsResult<()> {
        self.record(entity)?;
        if self.rigidbodies.contains_key(&entity) {
            return Err(PhysicsError::RigidbodyAlreadyAttached(entity));
        }
        self.rigidbodies.insert(entity, body);
        debug!("Attached arcade rigidbody to entity {:?}", entity);
        Ok(())
    }

    pub fn remove_rigidbody(&mut self, entity: Entity) -> Option<ArcadeRigidbody> {
        self.rigidbodies.shift_remove(&entity)
    }

    pub fn rigidbody(&self, entity: Entity) -> Option<&ArcadeRigidbody> {
        self.rigidbodies.get(&entity)
    }

    pub fn rigidbody_mut(&mut self, entity: Entity) -> Option<&mut ArcadeRigidbody> {
        self.rigidbodies.get_mut(&entity)
    }
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new(PhysicsConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{layer_bit, ALL_LAYERS};

    fn world() -> PhysicsWorld {
        PhysicsWorld::default()
    }

    fn spawn_box(world: &mut PhysicsWorld, x: f32, y: f32, width: f32, height: f32) -> (Entity, ColliderId) {
        spawn_box_with(world, x, y, width, height, ColliderConfig::default())
    }

    /// Box whose top-left corner is at (x, y)
    fn spawn_box_with(
        world: &mut PhysicsWorld,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        config: ColliderConfig,
    ) -> (Entity, ColliderId) {
        let center = Vec2::new(x + width * 0.5, y + height * 0.5);
        let entity = world.create_entity(Transform2D::from_position(center));
        let collider = world
            .add_collider(entity, ColliderShape::Box { width, height }, config)
            .unwrap();
        (entity, collider)
    }

    fn hash_snapshot(world: &PhysicsWorld) -> Vec<(i32, i32, Vec<ColliderId>)> {
        let mut cells: Vec<_> = world
            .spatial_hash()
            .cells()
            .map(|(coords, ids)| (coords.x, coords.y, ids.to_vec()))
            .collect();
        cells.sort_by_key(|(x, y, _)| (*x, *y));
        cells
    }

    #[test]
    fn test_second_collider_rejected() {
        let mut world = world();
        let (entity, existing) = spawn_box(&mut world, 0.0, 0.0, 10.0, 10.0);

        let err = world
            .add_collider(entity, ColliderShape::Circle { radius: 2.0 }, ColliderConfig::default())
            .unwrap_err();
        assert_eq!(err, PhysicsError::ColliderAlreadyAttached { entity, existing });
    }

    #[test]
    fn test_degenerate_polygon_rejected() {
        let mut world = world();
        let entity = world.create_entity(Transform2D::IDENTITY);
        let err = world
            .add_collider(
                entity,
                ColliderShape::Polygon { points: vec![Vec2::ZERO, Vec2::X] },
                ColliderConfig::default(),
            )
            .unwrap_err();
        assert_eq!(err, PhysicsError::DegeneratePolygon(2));
    }

    #[test]
    fn test_polygon_is_recentered() {
        let mut world = world();
        let entity = world.create_entity(Transform2D::from_position(Vec2::new(100.0, 100.0)));
        let points = vec![Vec2::new(0.0, 0.0), Vec2::new(30.0, 0.0), Vec2::new(0.0, 30.0)];
        let id = world
            .add_collider(entity, ColliderShape::Polygon { points }, ColliderConfig::default())
            .unwrap();

        assert_eq!(world.collider(id).unwrap().local_offset(), Vec2::new(10.0, 10.0));
        let bounds = world.collider_bounds(id).unwrap();
        assert!((bounds.location() - Vec2::new(100.0, 100.0)).length() < 1e-4);
    }

    #[test]
    fn test_auto_size_from_visual_bounds() {
        let mut world = world();
        let entity = world.create_entity(Transform2D::from_position(Vec2::new(10.0, 10.0)));

        let err = world
            .add_collider(entity, ColliderShape::AutoBox, ColliderConfig::default())
            .unwrap_err();
        assert_eq!(err, PhysicsError::CannotAutoSize(entity));

        world
            .set_visual_bounds(entity, Some(RectangleF::new(0.0, 0.0, 20.0, 40.0)))
            .unwrap();
        let id = world
            .add_collider(entity, ColliderShape::AutoBox, ColliderConfig::default())
            .unwrap();
        assert_eq!(world.collider_bounds(id).unwrap(), RectangleF::new(0.0, 0.0, 20.0, 40.0));
    }

    #[test]
    fn test_registration_follows_scene_and_enabled() {
        let mut world = world();
        let (entity, id) = spawn_box(&mut world, 0.0, 0.0, 10.0, 10.0);
        assert!(world.collider(id).unwrap().is_registered());

        world.set_collider_enabled(id, false).unwrap();
        assert!(!world.collider(id).unwrap().is_registered());
        assert_eq!(world.spatial_hash().cell_count(), 0);

        world.set_in_scene(entity, false).unwrap();
        world.set_collider_enabled(id, true).unwrap();
        assert!(!world.collider(id).unwrap().is_registered());

        world.set_in_scene(entity, true).unwrap();
        assert!(world.collider(id).unwrap().is_registered());
    }

    #[test]
    fn test_register_remove_leaves_hash_unchanged() {
        let mut world = world();
        spawn_box(&mut world, 0.0, 0.0, 30.0, 30.0);
        spawn_box(&mut world, 250.0, -40.0, 80.0, 300.0);
        let before = hash_snapshot(&world);

        let (entity, id) = spawn_box(&mut world, 90.0, 90.0, 150.0, 20.0);
        // Moving without a query in between leaves the registration stale
        world.set_position(entity, Vec2::new(900.0, 900.0)).unwrap();
        world.unregister_collider(id).unwrap();
        assert_eq!(hash_snapshot(&world), before);

        // Unregistering twice is a no-op
        world.unregister_collider(id).unwrap();
        assert_eq!(hash_snapshot(&world), before);
    }

    #[test]
    fn test_broadphase_soundness() {
        let mut world = world();
        let mut ids = Vec::new();
        for i in 0..20 {
            let x = (i * 37 % 400) as f32 - 200.0;
            let y = (i * 53 % 300) as f32 - 150.0;
            ids.push(spawn_box(&mut world, x, y, 15.0 + i as f32 * 3.0, 25.0).1);
        }

        let query = RectangleF::new(-60.0, -40.0, 120.0, 90.0);
        let found = world.aabb_broadphase(&query, None, ALL_LAYERS).to_vec();

        for id in ids {
            let intersects = query.intersects(&world.collider_bounds(id).unwrap());
            assert_eq!(found.contains(&id), intersects, "{id:?}");
        }
        let unique: ahash::AHashSet<ColliderId> = found.iter().copied().collect();
        assert_eq!(unique.len(), found.len());
    }

    #[test]
    fn test_broadphase_layer_filter_and_exclude() {
        let mut world = world();
        let (_, a) = spawn_box_with(&mut world, 0.0, 0.0, 10.0, 10.0, ColliderConfig::default().with_layer(2));
        let (_, b) = spawn_box(&mut world, 5.0, 5.0, 10.0, 10.0);
        let query = RectangleF::new(0.0, 0.0, 20.0, 20.0);

        assert_eq!(world.aabb_broadphase(&query, None, layer_bit(2)), &[a]);
        assert_eq!(world.aabb_broadphase(&query, Some(a), ALL_LAYERS), &[b]);
    }

    #[test]
    fn test_moved_collider_found_at_new_position() {
        let mut world = world();
        let (entity, id) = spawn_box(&mut world, 0.0, 0.0, 10.0, 10.0);
        world.set_position(entity, Vec2::new(505.0, 505.0)).unwrap();

        assert!(world.overlap_rectangle(&RectangleF::new(0.0, 0.0, 20.0, 20.0), ALL_LAYERS).is_none());
        assert_eq!(
            world.overlap_rectangle(&RectangleF::new(500.0, 500.0, 20.0, 20.0), ALL_LAYERS),
            Some(id)
        );
    }

    #[test]
    fn test_linecast_hits_box() {
        let mut world = world();
        let (_, id) = spawn_box(&mut world, 40.0, -5.0, 20.0, 10.0);

        let hit = world
            .linecast(Vec2::ZERO, Vec2::new(100.0, 0.0), ALL_LAYERS, &[])
            .unwrap();
        assert_eq!(hit.collider, Some(id));
        assert!((hit.point.x - 40.0).abs() < 1e-3);
        assert!((hit.fraction - 0.4).abs() < 1e-4);
        assert!((hit.distance - 40.0).abs() < 1e-3);
    }

    #[test]
    fn test_linecast_closest_regardless_of_insertion_order() {
        let layouts: [&[(f32, i32)]; 2] = [&[(300.0, 0), (120.0, 0), (520.0, 0)], &[(520.0, 0), (120.0, 0), (300.0, 0)]];
        for layout in layouts {
            let mut world = world();
            let mut near = None;
            for &(x, order) in layout {
                let config = ColliderConfig::default().with_cast_sort_order(order);
                let (_, id) = spawn_box_with(&mut world, x, -10.0, 30.0, 20.0, config);
                if x == 120.0 {
                    near = Some(id);
                }
            }

            let hit = world
                .linecast(Vec2::new(-50.0, 0.0), Vec2::new(700.0, 0.0), ALL_LAYERS, &[])
                .unwrap();
            assert_eq!(hit.collider, near);
        }
    }

    #[test]
    fn test_linecast_tie_goes_to_lower_sort_order() {
        let mut world = world();
        let (_, _) = spawn_box_with(&mut world, 50.0, -10.0, 20.0, 20.0, ColliderConfig::default().with_cast_sort_order(3));
        let (_, preferred) = spawn_box_with(&mut world, 50.0, -10.0, 20.0, 20.0, ColliderConfig::default().with_cast_sort_order(1));

        let hit = world
            .linecast(Vec2::ZERO, Vec2::new(100.0, 0.0), ALL_LAYERS, &[])
            .unwrap();
        assert_eq!(hit.collider, Some(preferred));
    }

    #[test]
    fn test_linecast_ignores_triggers_and_start_colliders() {
        let mut world = world();
        spawn_box_with(&mut world, 20.0, -10.0, 10.0, 20.0, ColliderConfig::trigger());
        spawn_box(&mut world, -10.0, -10.0, 20.0, 20.0);
        let (_, wall) = spawn_box(&mut world, 60.0, -10.0, 10.0, 20.0);

        let hit = world
            .linecast(Vec2::ZERO, Vec2::new(100.0, 0.0), ALL_LAYERS, &[])
            .unwrap();
        assert_eq!(hit.collider, Some(wall));

        assert!(world
            .linecast(Vec2::ZERO, Vec2::new(100.0, 0.0), ALL_LAYERS, &[wall])
            .is_none());

        // Only once starting inside is allowed does the surrounding box count
        let mut world = PhysicsWorld::new(PhysicsConfig {
            raycasts_start_in_colliders: true,
            ..PhysicsConfig::default()
        });
        let (_, around_start) = spawn_box(&mut world, -10.0, -10.0, 20.0, 20.0);
        let hit = world.linecast(Vec2::ZERO, Vec2::new(100.0, 0.0), ALL_LAYERS, &[]);
        assert_eq!(hit.and_then(|h| h.collider), Some(around_start));
    }

    #[test]
    fn test_linecast_all() {
        let mut world = world();
        for x in [30.0, 150.0, 260.0] {
            spawn_box(&mut world, x, -10.0, 10.0, 20.0);
        }

        let mut hits = Vec::new();
        let count = world.linecast_all(Vec2::ZERO, Vec2::new(400.0, 0.0), &mut hits, 8, ALL_LAYERS);
        assert_eq!(count, 3);
        assert!(hits.windows(2).all(|pair| pair[0].fraction <= pair[1].fraction));

        let count = world.linecast_all(Vec2::ZERO, Vec2::new(400.0, 0.0), &mut hits, 2, ALL_LAYERS);
        assert_eq!(count, 2);
        assert!((hits[0].point.x - 30.0).abs() < 1e-3);
    }

    #[test]
    fn test_overlap_queries() {
        let mut world = world();
        let (_, a) = spawn_box(&mut world, 0.0, 0.0, 10.0, 10.0);
        let entity = world.create_entity(Transform2D::from_position(Vec2::new(40.0, 5.0)));
        let circle = world
            .add_collider(entity, ColliderShape::Circle { radius: 5.0 }, ColliderConfig::default())
            .unwrap();

        let mut results = Vec::new();
        let count = world.overlap_rectangle_all(&RectangleF::new(-5.0, -5.0, 60.0, 20.0), &mut results, 10, ALL_LAYERS);
        assert_eq!(count, 2);

        let count = world.overlap_rectangle_all(&RectangleF::new(-5.0, -5.0, 60.0, 20.0), &mut results, 1, ALL_LAYERS);
        assert_eq!(count, 1);

        assert_eq!(world.overlap_circle(Vec2::new(48.0, 5.0), 4.0, ALL_LAYERS), Some(circle));
        assert_eq!(world.overlap_circle(Vec2::new(-3.0, 5.0), 4.0, ALL_LAYERS), Some(a));
        assert!(world.overlap_circle(Vec2::new(25.0, 5.0), 4.0, ALL_LAYERS).is_none());

        let count = world.overlap_circle_all(Vec2::new(25.0, 5.0), 20.0, &mut results, 10, ALL_LAYERS);
        assert_eq!(count, 2);
    }

    #[test]
    fn test_collider_at_point() {
        let mut world = world();
        let (_, id) = spawn_box(&mut world, 0.0, 0.0, 10.0, 10.0);
        assert_eq!(world.collider_at_point(Vec2::new(5.0, 5.0), ALL_LAYERS), Some(id));
        assert!(world.collider_at_point(Vec2::new(15.0, 5.0), ALL_LAYERS).is_none());
    }

    #[test]
    fn test_will_collide_with_any_backs_off() {
        let mut world = world();
        let (_, mover) = spawn_box(&mut world, 0.0, 0.0, 10.0, 10.0);
        let (_, wall) = spawn_box(&mut world, 20.0, -20.0, 10.0, 50.0);

        let mut motion = Vec2::new(15.0, 0.0);
        let result = world.will_collide_with_any(mover, &mut motion).unwrap().unwrap();
        assert_eq!(result.collider, Some(wall));
        assert_eq!(motion, Vec2::new(10.0, 0.0));

        assert!(world.collides_with_any(mover).unwrap().is_none());
    }

    #[test]
    fn test_clear_empties_hash() {
        let mut world = world();
        let (_, id) = spawn_box(&mut world, 0.0, 0.0, 10.0, 10.0);
        world.clear();
        assert_eq!(world.spatial_hash().cell_count(), 0);
        assert!(!world.collider(id).unwrap().is_registered());
        assert!(world.overlap_rectangle(&RectangleF::new(0.0, 0.0, 10.0, 10.0), ALL_LAYERS).is_none());
    }

    #[test]
    fn test_destroy_entity_unregisters() {
        let mut world = world();
        let (entity, id) = spawn_box(&mut world, 0.0, 0.0, 10.0, 10.0);
        world.destroy_entity(entity).unwrap();

        assert!(world.collider(id).is_none());
        assert_eq!(world.spatial_hash().cell_count(), 0);
        assert_eq!(world.destroy_entity(entity), Err(PhysicsError::UnknownEntity(entity)));
    }

    #[test]
    fn test_rotation_marks_collider_dirty() {
        let mut world = world();
        let (entity, id) = spawn_box(&mut world, -5.0, -5.0, 10.0, 10.0);
        world.set_rotation(entity, std::f32::consts::FRAC_PI_4).unwrap();

        let bounds = world.collider_bounds(id).unwrap();
        let diagonal = 10.0 * std::f32::consts::SQRT_2;
        assert!((bounds.width - diagonal).abs() < 1e-3);
    }
}

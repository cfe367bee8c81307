//! Colliders
//!
//! A collider pairs one [`Shape`] with the settings that decide who it
//! collides with. Colliders live in the [`PhysicsWorld`](crate::PhysicsWorld)
//! arena and point back at their entity by handle.
//!
//! World-space bounds are cached. Transform changes only flip a dirty flag;
//! the shape is recalculated the next time its bounds are read.

use brisk_core::{Entity, RectangleF, Transform2D, TransformComponent, Vec2};

use crate::config::{mask_includes, ColliderConfig, LayerMask, MAX_LAYERS};
use crate::results::CollisionResult;
use crate::shapes::{BoundsContext, Shape};

/// Collider handle with generation counter for stable IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColliderId {
    index: u32,
    generation: u32,
}

impl ColliderId {
    pub fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

/// How the shape of a new collider is chosen
#[derive(Debug, Clone, PartialEq)]
pub enum ColliderShape {
    Box { width: f32, height: f32 },
    Circle { radius: f32 },
    /// Points in any winding. They are recentered on their average and the
    /// average becomes part of the local offset.
    Polygon { points: Vec<Vec2> },
    /// Box sized from the entity's visual bounds
    AutoBox,
    /// Circle sized from the entity's visual bounds
    AutoCircle,
}

#[derive(Debug, Clone)]
pub struct Collider {
    id: ColliderId,
    entity: Entity,
    shape: Shape,
    is_trigger: bool,
    physics_layer: u32,
    collides_with_layers: LayerMask,
    local_offset: Vec2,
    cast_sort_order: i32,
    should_collider_scale_and_rotate_with_transform: bool,
    enabled: bool,
    is_position_dirty: bool,
    is_rotation_dirty: bool,
    /// Bounds used for the current spatial hash registration, if registered
    registered_physics_bounds: Option<RectangleF>,
}

impl Collider {
    pub(crate) fn new(id: ColliderId, entity: Entity, shape: Shape, config: &ColliderConfig) -> Self {
        Self {
            id,
            entity,
            shape,
            is_trigger: config.is_trigger,
            physics_layer: config.physics_layer.min(MAX_LAYERS - 1),
            collides_with_layers: config.collides_with_layers,
            local_offset: config.local_offset,
            cast_sort_order: config.cast_sort_order,
            should_collider_scale_and_rotate_with_transform: config
                .should_collider_scale_and_rotate_with_transform,
            enabled: true,
            is_position_dirty: true,
            is_rotation_dirty: true,
            registered_physics_bounds: None,
        }
    }

    pub fn id(&self) -> ColliderId {
        self.id
    }

    pub fn entity(&self) -> Entity {
        self.entity
    }

    /// The collider's shape. Its world-space data is only current after the
    /// bounds were refreshed through the world.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn is_trigger(&self) -> bool {
        self.is_trigger
    }

    pub fn physics_layer(&self) -> u32 {
        self.physics_layer
    }

    pub fn collides_with_layers(&self) -> LayerMask {
        self.collides_with_layers
    }

    pub fn local_offset(&self) -> Vec2 {
        self.local_offset
    }

    pub fn cast_sort_order(&self) -> i32 {
        self.cast_sort_order
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn should_collider_scale_and_rotate_with_transform(&self) -> bool {
        self.should_collider_scale_and_rotate_with_transform
    }

    pub fn registered_physics_bounds(&self) -> Option<RectangleF> {
        self.registered_physics_bounds
    }

    pub fn is_registered(&self) -> bool {
        self.registered_physics_bounds.is_some()
    }

    /// Whether this collider lives on a layer included in `mask`
    pub fn is_on_layer(&self, mask: LayerMask) -> bool {
        mask_includes(mask, self.physics_layer)
    }

    pub fn is_dirty(&self) -> bool {
        self.is_position_dirty || self.is_rotation_dirty
    }

    /// Bounds as of the last recalculation, possibly stale
    pub fn cached_bounds(&self) -> RectangleF {
        self.shape.bounds()
    }

    /// Current world-space bounds, recalculating the shape if the owning
    /// transform changed since the last read
    pub fn bounds(&mut self, transform: &Transform2D) -> RectangleF {
        if self.is_dirty() {
            let ctx = self.bounds_context(transform);
            self.shape.recalculate_bounds(&ctx);
            self.is_position_dirty = false;
            self.is_rotation_dirty = false;
        }
        self.shape.bounds()
    }

    fn bounds_context(&self, transform: &Transform2D) -> BoundsContext {
        BoundsContext {
            transform: *transform,
            local_offset: self.local_offset,
            scale_and_rotate: self.should_collider_scale_and_rotate_with_transform,
        }
    }

    /// Called when the owning entity's transform changes
    pub fn on_entity_transform_changed(&mut self, component: TransformComponent) {
        match component {
            TransformComponent::Position => self.is_position_dirty = true,
            TransformComponent::Rotation | TransformComponent::Scale => {
                self.is_rotation_dirty = true
            }
        }
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.is_position_dirty = true;
        self.is_rotation_dirty = true;
    }

    pub(crate) fn set_registered_physics_bounds(&mut self, bounds: Option<RectangleF>) {
        self.registered_physics_bounds = bounds;
    }

    pub(crate) fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub(crate) fn set_is_trigger(&mut self, is_trigger: bool) {
        self.is_trigger = is_trigger;
    }

    pub(crate) fn set_physics_layer(&mut self, layer: u32) {
        self.physics_layer = layer.min(MAX_LAYERS - 1);
    }

    pub(crate) fn set_collides_with_layers(&mut self, mask: LayerMask) {
        self.collides_with_layers = mask;
    }

    pub(crate) fn set_local_offset(&mut self, offset: Vec2) {
        if self.local_offset != offset {
            self.local_offset = offset;
            self.mark_dirty();
        }
    }

    pub(crate) fn set_cast_sort_order(&mut self, order: i32) {
        self.cast_sort_order = order;
    }

    /// Resize a box collider. Returns false for other shapes.
    pub(crate) fn update_box(&mut self, width: f32, height: f32) -> bool {
        match &mut self.shape {
            Shape::Box(shape) => {
                if shape.width() != width || shape.height() != height {
                    shape.update_box(width, height);
                    self.mark_dirty();
                }
                true
            }
            _ => false,
        }
    }

    /// Change a circle collider's radius. Returns false for other shapes.
    pub(crate) fn set_radius(&mut self, radius: f32) -> bool {
        match &mut self.shape {
            Shape::Circle(circle) => {
                if circle.radius() != radius {
                    circle.set_radius(radius);
                    self.mark_dirty();
                }
                true
            }
            _ => false,
        }
    }

    /// Boolean overlap against another collider. Both must have fresh bounds.
    pub fn overlaps(&self, other: &Collider) -> bool {
        self.shape.overlaps(&other.shape)
    }

    /// Narrow-phase test at the current positions. Both must have fresh bounds.
    pub fn collides_with(&self, other: &Collider) -> Option<CollisionResult> {
        self.shape
            .collides_with_shape(&other.shape)
            .map(|result| CollisionResult {
                collider: Some(other.id),
                ..result
            })
    }

    /// Test as if this collider had already moved by `motion`. The shape is
    /// restored before returning.
    pub fn will_collide_with(&mut self, other: &Collider, motion: Vec2) -> Option<CollisionResult> {
        let saved = self.shape.placement();
        self.shape.translate(motion);
        let result = self.collides_with(other);
        self.shape.set_placement(saved.0, saved.1);
        result
    }

    /// Narrow-phase test against a lone shape, such as a query probe
    pub(crate) fn overlaps_shape(&self, shape: &Shape) -> bool {
        self.shape.overlaps(shape)
    }
}

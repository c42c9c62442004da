//! An in-memory model of the compositor's scene graph.
//!
//! Actors are kept in paint order (bottom to top) under their parent. The stage
//! has two fixed groups: the window group, which holds window actors and
//! anything that must interleave with them, and the UI group painted above it.
//!
//! The host periodically forces the window group back into true window order
//! (`sync_window_stacking`). That throws away the position of every non-window
//! actor in the group, so anything that cares about its paint order has to
//! subscribe to [`Signal::Restacked`] and put itself back.

use std::fmt::Write as _;
use std::rc::Rc;
use std::time::Duration;

use ascii_tree::Tree;
use slotmap::SlotMap;
use strum::Display;
use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::model::window::WindowId;
use crate::sys::geometry::{Point, Rect};

slotmap::new_key_type! {
    pub struct ActorId;
    pub struct SignalHandlerId;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum Signal {
    ButtonPress,
    ButtonRelease,
    Enter,
    Restacked,
}

/// Result of a signal handler, mirroring the host's stop/propagate contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventPropagation {
    Propagate,
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActorEvent {
    pub signal: Signal,
    /// The actor the event was originally delivered to, before bubbling.
    pub source: ActorId,
    pub point: Option<Point>,
    pub time: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ActorContent {
    Group,
    Plain,
    Window(WindowId),
    Icon { name: String, size: f64 },
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SceneError {
    #[error("actor {0:?} does not exist")]
    StaleActor(ActorId),
    #[error("actors {0:?} and {1:?} are not siblings")]
    NotSiblings(ActorId, ActorId),
}

#[derive(Debug, Clone, Copy)]
struct OpacityTransition {
    from: u8,
    to: u8,
    duration: Duration,
    elapsed: Duration,
}

#[derive(Debug, Clone)]
pub struct Actor {
    name: String,
    rect: Rect,
    visible: bool,
    reactive: bool,
    opacity: u8,
    parent: Option<ActorId>,
    children: Vec<ActorId>,
    content: ActorContent,
    transition: Option<OpacityTransition>,
}

impl Actor {
    fn new(name: String, parent: Option<ActorId>, content: ActorContent) -> Self {
        Self {
            name,
            rect: Rect::ZERO,
            visible: true,
            reactive: false,
            opacity: u8::MAX,
            parent,
            children: Vec::new(),
            content,
            transition: None,
        }
    }

    pub fn name(&self) -> &str { &self.name }

    /// Geometry relative to the parent.
    pub fn rect(&self) -> Rect { self.rect }

    pub fn is_visible(&self) -> bool { self.visible }

    pub fn is_reactive(&self) -> bool { self.reactive }

    pub fn opacity(&self) -> u8 { self.opacity }

    pub fn parent(&self) -> Option<ActorId> { self.parent }

    pub fn children(&self) -> &[ActorId] { &self.children }

    pub fn content(&self) -> &ActorContent { &self.content }
}

pub type Handler = Rc<dyn Fn(&mut Scene, &ActorEvent) -> EventPropagation>;

struct Connection {
    actor: ActorId,
    signal: Signal,
    seq: u64,
    handler: Handler,
}

pub struct Scene {
    actors: SlotMap<ActorId, Actor>,
    handlers: SlotMap<SignalHandlerId, Connection>,
    next_seq: u64,
    stage: ActorId,
    window_group: ActorId,
    ui_group: ActorId,
    pointer_actor: Option<ActorId>,
    restacking: bool,
}

impl Default for Scene {
    fn default() -> Self { Self::new() }
}

impl Scene {
    pub fn new() -> Self {
        let mut actors = SlotMap::with_key();
        let stage = actors.insert(Actor::new("stage".into(), None, ActorContent::Group));
        let window_group = actors.insert(Actor::new(
            "window-group".into(),
            Some(stage),
            ActorContent::Group,
        ));
        let ui_group =
            actors.insert(Actor::new("ui-group".into(), Some(stage), ActorContent::Group));
        actors[stage].children = vec![window_group, ui_group];

        Self {
            actors,
            handlers: SlotMap::with_key(),
            next_seq: 0,
            stage,
            window_group,
            ui_group,
            pointer_actor: None,
            restacking: false,
        }
    }

    pub fn stage(&self) -> ActorId { self.stage }

    pub fn window_group(&self) -> ActorId { self.window_group }

    pub fn ui_group(&self) -> ActorId { self.ui_group }

    pub fn actor(&self, id: ActorId) -> Option<&Actor> { self.actors.get(id) }

    pub fn contains(&self, id: ActorId) -> bool { self.actors.contains_key(id) }

    /// Appends a new actor on top of `parent`'s children.
    pub fn add_actor(
        &mut self,
        parent: ActorId,
        name: impl Into<String>,
        content: ActorContent,
    ) -> Result<ActorId, SceneError> {
        if !self.actors.contains_key(parent) {
            return Err(SceneError::StaleActor(parent));
        }
        let id = self.actors.insert(Actor::new(name.into(), Some(parent), content));
        self.actors[parent].children.push(id);
        Ok(id)
    }

    pub fn add_window_actor(&mut self, window: WindowId, rect: Rect) -> ActorId {
        let group = self.window_group;
        let id = self.actors.insert(Actor::new(
            format!("window-{}", window.get()),
            Some(group),
            ActorContent::Window(window),
        ));
        self.actors[id].rect = rect;
        self.actors[group].children.push(id);
        id
    }

    pub fn window_actor(&self, window: WindowId) -> Option<ActorId> {
        self.actors[self.window_group]
            .children
            .iter()
            .copied()
            .find(|&id| self.actors[id].content == ActorContent::Window(window))
    }

    /// Destroys `id` and all of its descendants. Any handler still connected to
    /// a destroyed actor is dropped along with it.
    pub fn destroy(&mut self, id: ActorId) {
        if id == self.stage || id == self.window_group || id == self.ui_group {
            warn!(?id, "refusing to destroy a fixed scene group");
            return;
        }
        let Some(parent) = self.actors.get(id).map(|a| a.parent) else {
            trace!(?id, "destroy of stale actor ignored");
            return;
        };
        if let Some(parent) = parent.and_then(|p| self.actors.get_mut(p)) {
            parent.children.retain(|&child| child != id);
        }

        let mut pending = vec![id];
        while let Some(next) = pending.pop() {
            if let Some(actor) = self.actors.remove(next) {
                pending.extend(actor.children);
            }
            if self.pointer_actor == Some(next) {
                self.pointer_actor = None;
            }
            let before = self.handlers.len();
            self.handlers.retain(|_, conn| conn.actor != next);
            let dropped = before - self.handlers.len();
            if dropped > 0 {
                debug!(actor = ?next, dropped, "dropped handlers of destroyed actor");
            }
        }
    }

    fn with_actor_mut(&mut self, id: ActorId, f: impl FnOnce(&mut Actor)) {
        match self.actors.get_mut(id) {
            Some(actor) => f(actor),
            None => trace!(?id, "update of stale actor ignored"),
        }
    }

    pub fn set_position(&mut self, id: ActorId, origin: Point) {
        self.with_actor_mut(id, |a| a.rect = a.rect.with_origin(origin));
    }

    pub fn set_size(&mut self, id: ActorId, width: f64, height: f64) {
        self.with_actor_mut(id, |a| {
            a.rect.width = width;
            a.rect.height = height;
        });
    }

    pub fn set_rect(&mut self, id: ActorId, rect: Rect) {
        self.with_actor_mut(id, |a| a.rect = rect);
    }

    pub fn show(&mut self, id: ActorId) { self.with_actor_mut(id, |a| a.visible = true); }

    pub fn hide(&mut self, id: ActorId) { self.with_actor_mut(id, |a| a.visible = false); }

    pub fn set_reactive(&mut self, id: ActorId, reactive: bool) {
        self.with_actor_mut(id, |a| a.reactive = reactive);
    }

    pub fn set_opacity(&mut self, id: ActorId, opacity: u8) {
        self.with_actor_mut(id, |a| {
            a.opacity = opacity;
            a.transition = None;
        });
    }

    pub fn rect(&self, id: ActorId) -> Option<Rect> { self.actors.get(id).map(|a| a.rect) }

    /// Geometry in stage coordinates.
    pub fn absolute_rect(&self, id: ActorId) -> Option<Rect> {
        let actor = self.actors.get(id)?;
        let mut rect = actor.rect;
        let mut parent = actor.parent;
        while let Some(p) = parent.and_then(|p| self.actors.get(p)) {
            rect = rect.translate(p.rect.x, p.rect.y);
            parent = p.parent;
        }
        Some(rect)
    }

    pub fn is_visible(&self, id: ActorId) -> bool {
        self.actors.get(id).is_some_and(|a| a.visible)
    }

    pub fn children(&self, id: ActorId) -> &[ActorId] {
        self.actors.get(id).map(|a| a.children.as_slice()).unwrap_or_default()
    }

    pub fn index_of(&self, id: ActorId) -> Option<usize> {
        let parent = self.actors.get(id)?.parent?;
        self.actors[parent].children.iter().position(|&c| c == id)
    }

    pub fn is_immediately_above(&self, child: ActorId, sibling: ActorId) -> bool {
        let same_parent = match (self.actors.get(child), self.actors.get(sibling)) {
            (Some(c), Some(s)) => c.parent.is_some() && c.parent == s.parent,
            _ => false,
        };
        same_parent
            && matches!(
                (self.index_of(child), self.index_of(sibling)),
                (Some(c), Some(s)) if c == s + 1
            )
    }

    /// Moves `child` so it paints immediately above `sibling`.
    ///
    /// Returns `Ok(false)` when nothing had to move. This never emits
    /// [`Signal::Restacked`].
    pub fn set_child_above_sibling(
        &mut self,
        child: ActorId,
        sibling: ActorId,
    ) -> Result<bool, SceneError> {
        let child_parent = self.actors.get(child).ok_or(SceneError::StaleActor(child))?.parent;
        let sibling_parent =
            self.actors.get(sibling).ok_or(SceneError::StaleActor(sibling))?.parent;
        let parent = match (child_parent, sibling_parent) {
            (Some(a), Some(b)) if a == b && child != sibling => a,
            _ => return Err(SceneError::NotSiblings(child, sibling)),
        };
        if self.is_immediately_above(child, sibling) {
            return Ok(false);
        }

        let children = &mut self.actors[parent].children;
        children.retain(|&c| c != child);
        let at = children.iter().position(|&c| c == sibling).map_or(children.len(), |s| s + 1);
        children.insert(at, child);
        Ok(true)
    }

    pub fn connect(
        &mut self,
        actor: ActorId,
        signal: Signal,
        handler: impl Fn(&mut Scene, &ActorEvent) -> EventPropagation + 'static,
    ) -> SignalHandlerId {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.handlers.insert(Connection {
            actor,
            signal,
            seq,
            handler: Rc::new(handler),
        })
    }

    /// Subscribes to the host's "stacking changed" notification.
    pub fn connect_restacked(
        &mut self,
        handler: impl Fn(&mut Scene, &ActorEvent) -> EventPropagation + 'static,
    ) -> SignalHandlerId {
        self.connect(self.window_group, Signal::Restacked, handler)
    }

    pub fn disconnect(&mut self, id: SignalHandlerId) -> bool {
        let removed = self.handlers.remove(id).is_some();
        if !removed {
            warn!(?id, "disconnect of unknown signal handler");
        }
        removed
    }

    pub fn is_connected(&self, id: SignalHandlerId) -> bool { self.handlers.contains_key(id) }

    pub fn handler_count(&self, actor: ActorId) -> usize {
        self.handlers.values().filter(|conn| conn.actor == actor).count()
    }

    /// Runs the handlers connected to `actor` for the event's signal, in
    /// connection order, until one stops the event.
    pub fn emit(&mut self, actor: ActorId, event: &ActorEvent) -> EventPropagation {
        let mut handlers: Vec<(u64, Handler)> = self
            .handlers
            .values()
            .filter(|conn| conn.actor == actor && conn.signal == event.signal)
            .map(|conn| (conn.seq, conn.handler.clone()))
            .collect();
        handlers.sort_by_key(|(seq, _)| *seq);

        for (_, handler) in handlers {
            if handler(self, event) == EventPropagation::Stop {
                return EventPropagation::Stop;
            }
        }
        EventPropagation::Propagate
    }

    /// Topmost visible, reactive actor under `point`.
    pub fn pick(&self, point: Point) -> Option<ActorId> { self.pick_in(self.stage, point) }

    fn pick_in(&self, id: ActorId, point: Point) -> Option<ActorId> {
        let actor = self.actors.get(id)?;
        if !actor.visible {
            return None;
        }
        for &child in actor.children.iter().rev() {
            if let Some(hit) = self.pick_in(child, point) {
                return Some(hit);
            }
        }
        let hit = actor.reactive && self.absolute_rect(id).is_some_and(|r| r.contains(point));
        hit.then_some(id)
    }

    fn dispatch(&mut self, signal: Signal, target: ActorId, point: Point, time: u32) -> EventPropagation {
        let event = ActorEvent {
            signal,
            source: target,
            point: Some(point),
            time,
        };
        let mut current = Some(target);
        while let Some(actor) = current {
            if self.emit(actor, &event) == EventPropagation::Stop {
                return EventPropagation::Stop;
            }
            current = self.actors.get(actor).and_then(|a| a.parent);
        }
        EventPropagation::Propagate
    }

    pub fn button_press(&mut self, point: Point, time: u32) -> EventPropagation {
        match self.pick(point) {
            Some(target) => self.dispatch(Signal::ButtonPress, target, point, time),
            None => EventPropagation::Propagate,
        }
    }

    pub fn button_release(&mut self, point: Point, time: u32) -> EventPropagation {
        match self.pick(point) {
            Some(target) => self.dispatch(Signal::ButtonRelease, target, point, time),
            None => EventPropagation::Propagate,
        }
    }

    /// Emits `Enter` on the actor under the pointer when it differs from the
    /// one the pointer was last over.
    pub fn pointer_motion(&mut self, point: Point, time: u32) -> EventPropagation {
        let hit = self.pick(point);
        if hit == self.pointer_actor {
            return EventPropagation::Propagate;
        }
        self.pointer_actor = hit;
        match hit {
            Some(target) => self.dispatch(Signal::Enter, target, point, time),
            None => EventPropagation::Propagate,
        }
    }

    /// Forces the window group into `order`, the way the host does whenever
    /// its window stacking changes. Non-window actors lose their placement
    /// and sink to the bottom of the group. Subscribers are then notified.
    pub fn sync_window_stacking(&mut self, order: &[WindowId]) {
        if self.restacking {
            trace!("nested window stacking sync ignored");
            return;
        }
        self.restacking = true;

        let group = self.window_group;
        let rank = |scene: &Scene, id: ActorId| match scene.actors[id].content {
            ActorContent::Window(w) => order.iter().position(|&o| o == w).unwrap_or(order.len()),
            _ => order.len(),
        };
        let children = std::mem::take(&mut self.actors[group].children);
        let (mut windows, others): (Vec<_>, Vec<_>) = children
            .into_iter()
            .partition(|&id| matches!(self.actors[id].content, ActorContent::Window(_)));
        windows.sort_by_key(|&id| rank(self, id));
        let mut restacked = others;
        restacked.extend(windows);
        self.actors[group].children = restacked;

        trace!(windows = order.len(), "window group restacked");
        let event = ActorEvent {
            signal: Signal::Restacked,
            source: group,
            point: None,
            time: 0,
        };
        self.emit(group, &event);
        self.restacking = false;
    }

    /// Starts a linear opacity transition toward `to`.
    pub fn ease_opacity(&mut self, id: ActorId, to: u8, duration: Duration) {
        if duration.is_zero() {
            self.set_opacity(id, to);
            return;
        }
        self.with_actor_mut(id, |a| {
            a.transition = Some(OpacityTransition {
                from: a.opacity,
                to,
                duration,
                elapsed: Duration::ZERO,
            });
        });
    }

    pub fn has_transition(&self, id: ActorId) -> bool {
        self.actors.get(id).is_some_and(|a| a.transition.is_some())
    }

    /// Steps every running transition forward by `dt`.
    pub fn advance(&mut self, dt: Duration) {
        for actor in self.actors.values_mut() {
            let Some(mut t) = actor.transition else { continue };
            t.elapsed = (t.elapsed + dt).min(t.duration);
            let progress = t.elapsed.as_secs_f64() / t.duration.as_secs_f64();
            let value = f64::from(t.from) + (f64::from(t.to) - f64::from(t.from)) * progress;
            actor.opacity = value.round().clamp(0.0, 255.0) as u8;
            actor.transition = (t.elapsed < t.duration).then_some(t);
        }
    }

    pub fn dump_tree(&self) -> String {
        let mut out = String::new();
        if let Err(e) = ascii_tree::write_tree(&mut out, &self.tree_of(self.stage)) {
            warn!("failed to render scene tree: {e}");
        }
        out
    }

    fn tree_of(&self, id: ActorId) -> Tree {
        let actor = &self.actors[id];
        let mut label = actor.name.clone();
        if let ActorContent::Icon { name, .. } = &actor.content {
            let _ = write!(label, " <{name}>");
        }
        if actor.content != ActorContent::Group {
            let r = actor.rect;
            let _ = write!(label, " ({}, {}) {}x{}", r.x, r.y, r.width, r.height);
        }
        if !actor.visible {
            label.push_str(" [hidden]");
        }
        Tree::Node(label, actor.children.iter().map(|&c| self.tree_of(c)).collect())
    }
}

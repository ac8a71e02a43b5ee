use crate::store::Store;

/// Per-tick execution context handed to every system.
///
/// The external driver keeps one context alive for the whole session and
/// calls [`TickContext::advance`] once per frame before running any phase.
pub struct TickContext {
    tick: u64,
    delta: f32,
    store: Store,
}

impl TickContext {
    pub fn new() -> Self {
        Self::with_store(Store::new())
    }

    /// Create a context around a pre-populated store.
    pub fn with_store(store: Store) -> Self {
        Self {
            tick: 0,
            delta: 0.0,
            store,
        }
    }

    /// Begin the next frame with the given delta time in seconds.
    pub fn advance(&mut self, delta: f32) {
        self.tick += 1;
        self.delta = delta;
    }

    /// Frame counter, starting at 1 after the first `advance`.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Delta time of the current frame, in seconds.
    pub fn delta(&self) -> f32 {
        self.delta
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut Store {
        &mut self.store
    }
}

impl Default for TickContext {
    fn default() -> Self {
        Self::new()
    }
}

/// A system that runs once per tick.
pub trait System: Send + Sync {
    fn run(&mut self, ctx: &mut TickContext);
}

/// Blanket implementation so closures can be used as systems.
impl<F: FnMut(&mut TickContext) + Send + Sync> System for F {
    fn run(&mut self, ctx: &mut TickContext) {
        (self)(ctx);
    }
}

/// Value-like system handle. Carries no state of its own; anything that
/// must persist lives in the shared [`Store`].
pub type SystemFn = fn(&mut TickContext);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closure_system() {
        let mut ctx = TickContext::new();
        ctx.store_mut().insert(0u32);

        let mut system = |ctx: &mut TickContext| {
            let count = ctx.store_mut().get_mut::<u32>().unwrap();
            *count += 1;
        };
        system.run(&mut ctx);
        system.run(&mut ctx);
        assert_eq!(ctx.store().get::<u32>(), Some(&2));
    }

    #[test]
    fn fn_pointer_is_a_system() {
        fn bump(ctx: &mut TickContext) {
            ctx.store_mut().insert(99u32);
        }
        let mut system: SystemFn = bump;
        let mut ctx = TickContext::new();
        system.run(&mut ctx);
        assert_eq!(ctx.store().get::<u32>(), Some(&99));
    }

    #[test]
    fn advance_tracks_frames() {
        let mut ctx = TickContext::new();
        assert_eq!(ctx.tick(), 0);
        ctx.advance(0.016);
        ctx.advance(0.032);
        assert_eq!(ctx.tick(), 2);
        assert_eq!(ctx.delta(), 0.032);
    }
}

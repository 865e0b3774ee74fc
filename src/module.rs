//! Service modules for grouped registration.

use crate::container::Container;

/// A unit of service registrations.
///
/// Modules are how subsystems (HTTP, database, mail, ...) contribute their
/// services to an application's container.
///
/// # Example
///
/// ```rust
/// use ferrous_kernel::{Container, Resolver, ServiceModule};
///
/// struct Clock(u64);
///
/// struct TimeModule;
///
/// impl ServiceModule for TimeModule {
///     fn register(self, container: &Container) -> ferrous_kernel::Result<()> {
///         container.singleton("clock", |_| Ok(Clock(0)));
///         Ok(())
///     }
/// }
///
/// # fn main() -> ferrous_kernel::Result<()> {
/// let container = Container::new();
/// container.add_module(TimeModule)?;
/// assert_eq!(container.get::<Clock>("clock")?.0, 0);
/// # Ok(())
/// # }
/// ```
pub trait ServiceModule {
    /// Registers this module's services.
    fn register(self, container: &Container) -> crate::Result<()>;
}

impl<F> ServiceModule for F
where
    F: FnOnce(&Container) -> crate::Result<()>,
{
    fn register(self, container: &Container) -> crate::Result<()> {
        self(container)
    }
}

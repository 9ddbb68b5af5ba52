use weld_kernel::{Kernel, KernelIntrospect};

/// A kernel session the weld planners can both query and mutate.
///
/// Planners hold one `&mut dyn KernelBundle` for a whole evaluation;
/// `as_introspect` hands out a read-only view for helpers that only query.
pub trait KernelBundle: Kernel + KernelIntrospect {
    fn as_introspect(&self) -> &dyn KernelIntrospect;

    fn as_kernel(&mut self) -> &mut dyn Kernel;
}

impl<T: Kernel + KernelIntrospect> KernelBundle for T {
    fn as_introspect(&self) -> &dyn KernelIntrospect {
        self
    }

    fn as_kernel(&mut self) -> &mut dyn Kernel {
        self
    }
}

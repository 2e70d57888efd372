/// Methods every program handle shares.
macro_rules! program_handle {
    ($ty:ident, $what:literal) => {
        impl $ty {
            /// Replaces a uniform, texture, sampler or buffer by name. The
            /// binding plan is unchanged; the value must fit its slot.
            pub fn set_uniform(
                &self,
                ctx: &mut $crate::context::Context,
                name: &str,
                value: impl Into<$crate::binding::BindingValue>,
            ) -> $crate::error::Result<()> {
                super::submit::set_uniform(ctx, self.ctx, self.key, $what, name, value.into())
            }

            /// Current CPU-side value of `name`; `None` when nothing is bound.
            pub fn uniform(
                &self,
                ctx: &$crate::context::Context,
                name: &str,
            ) -> $crate::error::Result<Option<$crate::binding::BindingValue>> {
                super::submit::program(ctx, self.ctx, self.key, $what)?.core.uniform(name)
            }

            pub fn plan<'a>(
                &self,
                ctx: &'a $crate::context::Context,
            ) -> $crate::error::Result<&'a $crate::binding::BindingPlan> {
                Ok(&super::submit::program(ctx, self.ctx, self.key, $what)?.core.plan)
            }

            pub fn label<'a>(&self, ctx: &'a $crate::context::Context) -> $crate::error::Result<&'a str> {
                Ok(&super::submit::program(ctx, self.ctx, self.key, $what)?.core.label)
            }

            /// `true` when the shader failed to compile and calls are skipped.
            pub fn is_broken(&self, ctx: &$crate::context::Context) -> $crate::error::Result<bool> {
                Ok(super::submit::program(ctx, self.ctx, self.key, $what)?.core.broken)
            }

            pub fn bind_group_cache_stats(
                &self,
                ctx: &$crate::context::Context,
            ) -> $crate::error::Result<super::cache::CacheStats> {
                Ok(super::submit::program(ctx, self.ctx, self.key, $what)?.core.cache_stats())
            }

            /// Releases program-owned buffers, pipelines and cached bind
            /// groups. Bound caller resources stay alive. Idempotent.
            pub fn dispose(&self, ctx: &mut $crate::context::Context) {
                super::submit::dispose(ctx, self.ctx, self.key)
            }
        }
    };
}

pub(crate) use program_handle;

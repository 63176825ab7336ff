//! The build pipeline: an explicit ordered list of named steps.
//!
//! A [`Pipeline`] owns its [`Step`]s and runs them strictly in order; a step
//! must resolve before the next one starts, and the first failure aborts the
//! rest, reported under the failing step's name. Steps close over whatever
//! they need (the bundler adapter, for one) and receive the immutable
//! [`BuildContext`] per invocation.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use kiln_bundler::BundlerAdapter;
use kiln_config::BuildContext;

use crate::error::{CliError, Result};
use crate::steps;

/// Future returned by one step invocation.
pub type StepFuture = Pin<Box<dyn Future<Output = Result<()>> + Send>>;

/// One named, awaitable build transformation.
pub struct Step {
    name: &'static str,
    run: Box<dyn Fn(BuildContext) -> StepFuture + Send + Sync>,
}

impl Step {
    /// Create a step from an async closure over the build context.
    pub fn new<F, Fut>(name: &'static str, run: F) -> Self
    where
        F: Fn(BuildContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        Self {
            name,
            run: Box::new(move |ctx| Box::pin(run(ctx))),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl std::fmt::Debug for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Step").field("name", &self.name).finish()
    }
}

/// An ordered sequence of named steps.
#[derive(Debug)]
pub struct Pipeline {
    name: &'static str,
    steps: Vec<Step>,
}

impl Pipeline {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            steps: Vec::new(),
        }
    }

    /// Append a step. Steps run in append order.
    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Names of the steps, in run order.
    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|s| s.name).collect()
    }

    /// Run every step in order against `ctx`.
    ///
    /// Stops at the first failure and wraps it in [`CliError::Pipeline`]
    /// with the failing step's name.
    pub async fn run(&self, ctx: &BuildContext) -> Result<()> {
        tracing::info!(
            pipeline = self.name,
            mode = ctx.mode().as_str(),
            steps = self.steps.len(),
            "pipeline started"
        );

        for step in &self.steps {
            tracing::debug!(step = step.name, "step started");
            (step.run)(ctx.clone())
                .await
                .map_err(|source| CliError::Pipeline {
                    step: step.name,
                    source: Box::new(source),
                })?;
            tracing::debug!(step = step.name, "step finished");
        }

        tracing::info!(pipeline = self.name, "pipeline finished");
        Ok(())
    }
}

/// The production build pipeline.
pub fn production(adapter: Arc<BundlerAdapter>) -> Pipeline {
    assemble("production", adapter)
}

/// The development build pipeline. Same step order as production; the mode
/// carried by the context conditions each step's behavior.
pub fn development(adapter: Arc<BundlerAdapter>) -> Pipeline {
    assemble("development", adapter)
}

fn assemble(name: &'static str, adapter: Arc<BundlerAdapter>) -> Pipeline {
    Pipeline::new(name)
        .step(Step::new("clean-temp", |ctx| async move {
            steps::clean::clean_temp_output(&ctx).await
        }))
        .step(Step::new("compile-assets", {
            let adapter = Arc::clone(&adapter);
            move |ctx| {
                let adapter = Arc::clone(&adapter);
                async move { steps::assets::compile_assets(&adapter, &ctx).await }
            }
        }))
        .step(Step::new("compress-images", |ctx| async move {
            steps::images::compress_images(&ctx).await.map(|_| ())
        }))
        .step(Step::new("compile-templates", |ctx| async move {
            steps::templates::compile_templates(&ctx).await
        }))
        .step(Step::new("inject-references", |ctx| async move {
            steps::inject::inject_references(&ctx).await
        }))
        .step(Step::new("clean-public", |ctx| async move {
            steps::clean::clean_public_output(&ctx).await
        }))
        .step(Step::new("publish", |ctx| async move {
            steps::publish::publish(&ctx, None, None).await.map(|_| ())
        }))
}

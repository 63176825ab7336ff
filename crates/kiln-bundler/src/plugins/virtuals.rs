//! Virtual modules serving build data to application code.
//!
//! Scripts can import three specifiers that never exist on disk:
//!
//! - `kiln:globals` - the template globals document as a default export
//! - `kiln:style-variables` - resolved stylesheet custom properties
//! - `kiln:env` - build constants (`PRODUCTION`, `VERSION`, `NODE_ENV`)
//!
//! The synthetic entry module lives here too, so the whole set is one
//! resolve/load pair.

use std::borrow::Cow;

use rolldown_common::{ModuleType, ResolvedExternal};
use rolldown_plugin::{
    HookLoadArgs, HookLoadOutput, HookLoadReturn, HookResolveIdArgs, HookResolveIdOutput,
    HookResolveIdReturn, HookUsage, Plugin, PluginContext,
};
use rustc_hash::FxHashMap;

use crate::generated::{ENTRY_SPECIFIER, GeneratedConfig};

pub const GLOBALS_SPECIFIER: &str = "kiln:globals";
pub const STYLE_VARIABLES_SPECIFIER: &str = "kiln:style-variables";
pub const ENV_SPECIFIER: &str = "kiln:env";

/// Serves the synthetic entry and the `kiln:` build-data modules.
#[derive(Debug)]
pub struct VirtualModulesPlugin {
    modules: FxHashMap<String, String>,
}

impl VirtualModulesPlugin {
    pub fn new(config: &GeneratedConfig) -> Self {
        let mut modules = FxHashMap::default();
        modules.insert(ENTRY_SPECIFIER.to_string(), config.entry_source());
        modules.insert(
            GLOBALS_SPECIFIER.to_string(),
            format!("export default {};\n", config.globals),
        );
        modules.insert(
            STYLE_VARIABLES_SPECIFIER.to_string(),
            format!("export default {};\n", config.style_variables.to_json()),
        );
        modules.insert(ENV_SPECIFIER.to_string(), env_module(config));
        Self { modules }
    }
}

impl Plugin for VirtualModulesPlugin {
    fn name(&self) -> Cow<'static, str> {
        "kiln:virtual-modules".into()
    }

    fn register_hook_usage(&self) -> HookUsage {
        HookUsage::ResolveId | HookUsage::Load
    }

    /// Claim exactly our specifiers so the resolver never touches disk
    /// for them.
    fn resolve_id(
        &self,
        _ctx: &PluginContext,
        args: &HookResolveIdArgs,
    ) -> impl std::future::Future<Output = HookResolveIdReturn> + Send {
        let specifier = args.specifier.to_string();
        let known = self.modules.contains_key(&specifier);

        async move {
            if known {
                return Ok(Some(HookResolveIdOutput {
                    id: specifier.into(),
                    external: Some(ResolvedExternal::Bool(false)),
                    ..Default::default()
                }));
            }
            Ok(None)
        }
    }

    fn load(
        &self,
        _ctx: &PluginContext,
        args: &HookLoadArgs<'_>,
    ) -> impl std::future::Future<Output = HookLoadReturn> + Send {
        let code = self.modules.get(args.id).cloned();

        async move {
            match code {
                Some(code) => Ok(Some(HookLoadOutput {
                    code: code.into(),
                    module_type: Some(ModuleType::Js),
                    ..Default::default()
                })),
                None => Ok(None),
            }
        }
    }
}

fn env_module(config: &GeneratedConfig) -> String {
    let node_env = if config.mode.is_production() {
        "production"
    } else {
        "development"
    };
    format!(
        "export const PRODUCTION = {};\n\
         export const VERSION = {:?};\n\
         export const NODE_ENV = {:?};\n\
         export default {{ PRODUCTION, VERSION, NODE_ENV }};\n",
        config.mode.is_production(),
        config.version,
        node_env,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_config::{BuildContext, KilnConfig, Mode};
    use std::sync::Arc;

    fn config(mode: Mode) -> GeneratedConfig {
        let ctx = BuildContext::new(mode, Arc::new(KilnConfig::default()));
        GeneratedConfig::from_context(&ctx).unwrap()
    }

    #[test]
    fn env_module_reflects_the_mode() {
        let dev = env_module(&config(Mode::Development));
        assert!(dev.contains("PRODUCTION = false"));
        assert!(dev.contains("NODE_ENV = \"development\""));

        let prod = env_module(&config(Mode::Production));
        assert!(prod.contains("PRODUCTION = true"));
        assert!(prod.contains("NODE_ENV = \"production\""));
    }

    #[test]
    fn plugin_serves_all_build_data_specifiers() {
        let plugin = VirtualModulesPlugin::new(&config(Mode::Development));
        for specifier in [
            ENTRY_SPECIFIER,
            GLOBALS_SPECIFIER,
            STYLE_VARIABLES_SPECIFIER,
            ENV_SPECIFIER,
        ] {
            assert!(plugin.modules.contains_key(specifier), "{specifier}");
        }
    }

    #[test]
    fn globals_module_defaults_to_empty_object() {
        let plugin = VirtualModulesPlugin::new(&config(Mode::Development));
        assert_eq!(
            plugin.modules[GLOBALS_SPECIFIER],
            "export default {};\n"
        );
    }
}

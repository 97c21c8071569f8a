/// Application name, used for directory names and log messages.
pub const APP_NAME: &str = "mapgen";

/// Prefix for environment variables read by the CLI and exported to engines.
pub const ENV_PREFIX: &str = "MAPGEN_";

/// Output directory, relative to the host build directory.
pub const DEFAULT_OUTPUT_SUBDIR: &str = "generated-sources/mapgen";

/// Configuration document, relative to the host project base directory.
pub const DEFAULT_CONFIGURATION_FILE: &str = "src/main/resources/generatorConfig.xml";

/// Include pattern used when registering the output directory as a resource root.
pub const XML_RESOURCE_PATTERN: &str = "**/*.xml";

/// Prefix marking a script path that is resolved through the lookup context.
pub const CLASSPATH_PREFIX: &str = "classpath:";

/// `targetProject` value that stands for the configured output directory.
pub const OUTPUT_PROJECT_SENTINEL: &str = "MAPGEN";

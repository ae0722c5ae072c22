use std::sync::Arc;

use tracing::debug;

use super::{
    ChunkDyconitPolicy, DyconitPolicy, InfiniteBoundsPolicy, QuadraticGradientStalenessAoI,
    SingleDyconitPolicy, ZeroBoundsPolicy,
};
use crate::{error::ConfigError, world::Viewer};

/// Числовые параметры после имени политики: `Single;20;5`.
struct Parameters<'a> {
    policy: &'static str,
    values: Vec<&'a str>,
}

impl Parameters<'_> {
    fn u32_at(
        &self,
        index: usize,
        name: &str,
    ) -> Result<u32, ConfigError> {
        let raw = self.values.get(index).copied().ok_or_else(|| {
            ConfigError::invalid_parameter(
                name,
                "",
                format!("{} expects a value at position {}", self.policy, index + 1),
            )
        })?;
        raw.trim()
            .parse()
            .map_err(|err| ConfigError::invalid_parameter(name, raw, err))
    }

    fn single_bounds(&self) -> Result<(u32, u32), ConfigError> {
        Ok((self.u32_at(0, "staleness")?, self.u32_at(1, "numerical")?))
    }
}

const CHUNK: &str = "ChunkDyconitPolicy";
const ZERO: &str = "ZeroBoundsPolicy";
const INFINITE: &str = "InfiniteBoundsPolicy";
const SINGLE: &str = "SingleDyconitPolicy";
const QUADRATIC: &str = "QuadraticGradientStalenessAoI";

/// Имена типов политик в порядке сопоставления.
pub const POLICY_NAMES: [&str; 5] = [CHUNK, ZERO, INFINITE, SINGLE, QUADRATIC];

/// Создаёт dyconit-политику по строке вида `имя[;параметр...]`.
///
/// Имя сравнивается без учёта регистра как префикс имени типа
/// политики: `chunk`, `zero`, `Single;20;5`, `quadratic`. Для неизвестного
/// или пустого имени возвращается `Ok(None)`.
pub fn policy_from_str<S, M>(
    descriptor: &str,
    view_distance: u32,
) -> Result<Option<Arc<dyn DyconitPolicy<S, M>>>, ConfigError>
where
    S: Viewer + 'static,
    M: 'static,
{
    let Some(params) = parse_descriptor(descriptor) else {
        debug!(descriptor, "No dyconit policy matches");
        return Ok(None);
    };

    let policy: Arc<dyn DyconitPolicy<S, M>> = match params.policy {
        CHUNK => Arc::new(ChunkDyconitPolicy::new(view_distance)),
        ZERO => Arc::new(ZeroBoundsPolicy),
        INFINITE => Arc::new(InfiniteBoundsPolicy),
        SINGLE => {
            let (staleness, numerical) = params.single_bounds()?;
            Arc::new(SingleDyconitPolicy::new(staleness, numerical))
        }
        _ => Arc::new(QuadraticGradientStalenessAoI::new(view_distance)),
    };
    Ok(Some(policy))
}

/// Проверяет строку политики без создания политики.
///
/// В отличие от [`policy_from_str`], непустое имя, которому не
/// соответствует ни одна политика, считается ошибкой.
pub fn validate_descriptor(descriptor: &str) -> Result<(), ConfigError> {
    if descriptor.split(';').next().unwrap_or_default().trim().is_empty() {
        return Ok(());
    }
    let params = parse_descriptor(descriptor).ok_or_else(|| {
        ConfigError::invalid_parameter(
            "policy.dyconit",
            descriptor,
            format!("no dyconit policy matches, expected a prefix of one of {POLICY_NAMES:?}"),
        )
    })?;
    if params.policy == SINGLE {
        params.single_bounds()?;
    }
    Ok(())
}

fn parse_descriptor(descriptor: &str) -> Option<Parameters<'_>> {
    let mut parts = descriptor.split(';');
    let name = parts.next().unwrap_or_default().trim();
    if name.is_empty() {
        return None;
    }

    let wanted = name.to_lowercase();
    let policy = POLICY_NAMES
        .into_iter()
        .find(|policy| policy.to_lowercase().starts_with(&wanted))?;
    Some(Parameters {
        policy,
        values: parts.collect(),
    })
}

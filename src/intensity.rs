use {super::*, anyhow::Context};

const PLAIN: RangeInclusive<u32> = 8..=31;
const X: RangeInclusive<u32> = 1..=9999;
const RAW: RangeInclusive<u32> = 1..=2_147_483_647;

/// How GPU work sizes are expressed. Each mode carries one value per device;
/// devices past the end of the list reuse the last value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", content = "values", rename_all = "lowercase")]
pub enum IntensityMode {
    Raw(Vec<u32>),
    X(Vec<u32>),
    Plain(Vec<u32>),
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

fn parse_list(name: &str, list: &str, range: RangeInclusive<u32>) -> Result<Vec<u32>> {
    list.split(',')
        .map(|value| {
            let value = value.trim();
            let n = value
                .parse::<u32>()
                .with_context(|| format!("invalid {name} `{value}`"))?;

            ensure!(
                range.contains(&n),
                "{name} {n} out of range {}-{}",
                range.start(),
                range.end()
            );

            Ok(n)
        })
        .collect()
}

impl IntensityMode {
    /// Raw intensity wins over xintensity, which wins over intensity. Returns
    /// `None` when all three are unset.
    pub fn resolve(raw: Option<&str>, x: Option<&str>, plain: Option<&str>) -> Result<Option<Self>> {
        if let Some(raw) = non_empty(raw) {
            return parse_list("rawintensity", raw, RAW).map(|values| Some(Self::Raw(values)));
        }

        if let Some(x) = non_empty(x) {
            return parse_list("xintensity", x, X).map(|values| Some(Self::X(values)));
        }

        if let Some(plain) = non_empty(plain) {
            return parse_list("intensity", plain, PLAIN).map(|values| Some(Self::Plain(values)));
        }

        Ok(None)
    }

    fn values(&self) -> &[u32] {
        match self {
            Self::Raw(values) | Self::X(values) | Self::Plain(values) => values,
        }
    }

    pub fn for_device(&self, device: usize) -> u32 {
        let values = self.values();
        values
            .get(device)
            .or_else(|| values.last())
            .copied()
            .unwrap_or_default()
    }
}

impl Display for IntensityMode {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let name = match self {
            Self::Raw(_) => "rawintensity",
            Self::X(_) => "xintensity",
            Self::Plain(_) => "intensity",
        };

        let values = self
            .values()
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(",");

        write!(f, "{name} {values}")
    }
}

#[cfg(test)]
mod tests {
    use {super::*, pretty_assertions::assert_eq};

    #[test]
    fn first_non_empty_wins() {
        assert_eq!(
            IntensityMode::resolve(Some("64"), Some("2"), Some("13")).unwrap(),
            Some(IntensityMode::Raw(vec![64]))
        );
        assert_eq!(
            IntensityMode::resolve(Some(" "), Some("2,3"), Some("13")).unwrap(),
            Some(IntensityMode::X(vec![2, 3]))
        );
        assert_eq!(
            IntensityMode::resolve(None, Some(""), Some("13")).unwrap(),
            Some(IntensityMode::Plain(vec![13]))
        );
        assert_eq!(IntensityMode::resolve(None, None, None).unwrap(), None);
    }

    #[test]
    fn ranges_enforced() {
        assert!(IntensityMode::resolve(None, None, Some("7")).is_err());
        assert!(IntensityMode::resolve(None, None, Some("32")).is_err());
        assert!(IntensityMode::resolve(None, Some("0"), None).is_err());
        assert!(IntensityMode::resolve(Some("abc"), None, None).is_err());
    }

    #[test]
    fn higher_priority_errors_are_not_masked() {
        assert!(IntensityMode::resolve(Some("0"), Some("2"), None).is_err());
    }

    #[test]
    fn per_device_values() {
        let mode = IntensityMode::Plain(vec![10, 12]);
        assert_eq!(mode.for_device(0), 10);
        assert_eq!(mode.for_device(1), 12);
        assert_eq!(mode.for_device(5), 12);
        assert_eq!(mode.to_string(), "intensity 10,12");
    }
}

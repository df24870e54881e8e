use crate::error::InputError;

/// Per-node freight demand. Node `j` is the `j`-th entry, counted from 1.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemandVector {
    demands: Vec<u64>,
}

impl DemandVector {
    pub fn new(demands: Vec<i64>) -> Result<Self, InputError> {
        if demands.is_empty() {
            return Err(InputError::Empty);
        }
        let demands = demands
            .into_iter()
            .enumerate()
            .map(|(i, value)| u64::try_from(value).map_err(|_| InputError::Negative { node: i + 1, value }))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { demands })
    }

    /// Parse comma- and/or whitespace-separated integers, e.g. `"120, 40 0"`
    pub fn parse(source: &str) -> Result<Self, InputError> {
        Self::parse_tokens(
            source
                .split(|c: char| c == ',' || c.is_whitespace())
                .filter(|token| !token.is_empty()),
        )
    }

    /// Parse one demand per token
    pub fn parse_tokens<'a>(tokens: impl IntoIterator<Item = &'a str>) -> Result<Self, InputError> {
        let demands = tokens
            .into_iter()
            .enumerate()
            .map(|(i, token)| {
                token.trim().parse::<i64>().map_err(|_| InputError::NotAnInteger {
                    node: i + 1,
                    token: token.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(demands)
    }

    pub fn len(&self) -> usize {
        self.demands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.demands.is_empty()
    }

    /// Demand of a 1-based node
    pub fn get(&self, node: usize) -> Option<u64> {
        node.checked_sub(1).and_then(|j| self.demands.get(j)).copied()
    }

    pub fn total(&self) -> u64 {
        self.demands.iter().sum()
    }

    pub fn as_slice(&self) -> &[u64] {
        &self.demands
    }

    /// `(node, demand)` pairs with 1-based node numbers
    pub fn iter(&self) -> impl Iterator<Item = (usize, u64)> + '_ {
        self.demands.iter().enumerate().map(|(j, d)| (j + 1, *d))
    }
}

impl TryFrom<Vec<i64>> for DemandVector {
    type Error = InputError;

    fn try_from(demands: Vec<i64>) -> Result<Self, Self::Error> {
        Self::new(demands)
    }
}

impl TryFrom<&[i64]> for DemandVector {
    type Error = InputError;

    fn try_from(demands: &[i64]) -> Result<Self, Self::Error> {
        Self::new(demands.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_accepts_zero_and_positive() {
        let demands = DemandVector::new(vec![0, 40, 500]).unwrap();
        assert_eq!(demands.len(), 3);
        assert_eq!(demands.total(), 540);
        assert_eq!(demands.get(1), Some(0));
        assert_eq!(demands.get(3), Some(500));
        assert_eq!(demands.get(0), None);
        assert_eq!(demands.get(4), None);
        assert_eq!(demands.iter().collect::<Vec<_>>(), vec![(1, 0), (2, 40), (3, 500)]);
    }

    #[test]
    fn test_rejects_empty_and_negative() {
        assert_eq!(DemandVector::new(vec![]), Err(InputError::Empty));
        assert_eq!(
            DemandVector::new(vec![10, -3]),
            Err(InputError::Negative { node: 2, value: -3 })
        );
    }

    #[test]
    fn test_parse_separators() {
        let demands = DemandVector::parse("120, 40 0\n7").unwrap();
        assert_eq!(demands.as_slice(), &[120, 40, 0, 7]);
    }

    #[test]
    fn test_parse_rejects_non_integers() {
        assert_eq!(
            DemandVector::parse("10, 2.5"),
            Err(InputError::NotAnInteger {
                node: 2,
                token: "2.5".to_string()
            })
        );
        assert_eq!(DemandVector::parse(" , "), Err(InputError::Empty));
        assert_eq!(
            DemandVector::parse("5 -1"),
            Err(InputError::Negative { node: 2, value: -1 })
        );
    }

    #[test]
    fn test_parse_tokens() {
        let demands = DemandVector::parse_tokens(["3", " 4 "]).unwrap();
        assert_eq!(demands.as_slice(), &[3, 4]);
    }
}

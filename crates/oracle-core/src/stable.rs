use rust_decimal::Decimal;

/// A stable-coin feed pinned to a fixed value. Fetched once at boot;
/// thereafter only an explicit operator `refresh()` call re-reads it.
#[derive(Debug, Clone)]
pub struct StableFeed {
    symbol: String,
    pinned: Decimal,
    refreshed_at_boot: bool,
}

impl StableFeed {
    pub fn new(symbol: impl Into<String>, pinned: Decimal) -> Self {
        Self { symbol: symbol.into(), pinned, refreshed_at_boot: false }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn value(&self) -> Decimal {
        self.pinned
    }

    /// Boot-time read. A no-op after the first call; use `refresh` for any
    /// later update.
    pub fn boot(&mut self, pinned: Decimal) {
        if !self.refreshed_at_boot {
            self.pinned = pinned;
            self.refreshed_at_boot = true;
        }
    }

    /// Operator-driven refresh, the only way to change the pinned value
    /// after boot.
    pub fn refresh(&mut self, pinned: Decimal) {
        self.pinned = pinned;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boot_only_applies_once() {
        let mut feed = StableFeed::new("USDX", Decimal::ONE);
        feed.boot(Decimal::new(101, 2));
        feed.boot(Decimal::new(102, 2));
        assert_eq!(feed.value(), Decimal::new(101, 2));
    }

    #[test]
    fn refresh_always_applies() {
        let mut feed = StableFeed::new("USDX", Decimal::ONE);
        feed.refresh(Decimal::new(99, 2));
        assert_eq!(feed.value(), Decimal::new(99, 2));
    }
}

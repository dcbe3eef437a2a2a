//! Plain-text rendering of a scenario bundle.

use std::fmt;

use crate::scenario::ScenarioBundle;
use crate::tariff::Jurisdiction;

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

impl fmt::Display for ScenarioBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Scenario Report ---")?;
        writeln!(
            f,
            "Jurisdiction: {}   current tariff: {}   dynamic prices: {:?}",
            self.jurisdiction, self.current_tariff, self.price_source
        )?;

        writeln!(f, "\nA1 (current tariff, net metering, no battery)")?;
        writeln!(f, "  {}", self.a1)?;
        writeln!(f, "\nB1 (no net metering, no battery)")?;
        for r in self.b1.values() {
            writeln!(f, "  {r}")?;
        }
        writeln!(f, "\nC1 (no net metering, with battery)")?;
        for r in self.c1.values() {
            writeln!(f, "  {r}")?;
        }
        if let Some(c1) = self.c1_current() {
            let b = &c1.breakdown;
            writeln!(
                f,
                "  breakdown ({}): energy={:.2} feed-in={:.2} inverter={:.2} \
                 capacity={:.2} fixed={:.2}",
                c1.variant, b.energy, b.feed_in, b.inverter, b.capacity, b.fixed
            )?;
        }

        if self.jurisdiction == Jurisdiction::PeakBilled {
            writeln!(f, "\nMonthly peaks (kW, before -> after)")?;
            for (m, name) in MONTHS.iter().enumerate() {
                writeln!(
                    f,
                    "  {name}: {:>6.2} -> {:>6.2}",
                    self.monthly_peaks_before[m], self.monthly_peaks_after[m]
                )?;
            }
        }

        writeln!(f, "\n--- Energy without battery ---")?;
        writeln!(f, "{}", self.kpis_without_battery)?;
        writeln!(f, "\n--- Energy with battery ---")?;
        writeln!(f, "{}", self.kpis_with_battery)?;

        writeln!(f, "\n--- Return on investment ---")?;
        writeln!(f, "Yearly saving:         {:.2}", self.saving)?;
        match self.roi.payback_year {
            Some(y) => writeln!(f, "Payback year:          {y}")?,
            None => writeln!(f, "Payback year:          not within horizon")?,
        }
        write!(f, "ROI over horizon:      {:.1}%", self.roi.roi_percent)
    }
}

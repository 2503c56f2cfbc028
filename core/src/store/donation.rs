use super::LedgerStore;
use crate::{
    error::{AnalyticsError, AnalyticsResult},
    ledger::{DonationRecord, DonationSource},
    period::{Period, DATE_FORMAT},
    types::CurrencyCode,
};
use chrono::NaiveDate;
use rusqlite::params;
use rust_decimal::Decimal;
use std::str::FromStr;

fn parse_amount(raw: &str) -> AnalyticsResult<Decimal> {
    Decimal::from_str(raw.trim())
        .map_err(|_| AnalyticsError::InvalidAmount { value: raw.to_string() })
}

fn parse_stored_date(raw: &str) -> AnalyticsResult<NaiveDate> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .map_err(|e| AnalyticsError::Other(anyhow::anyhow!("bad donation_date '{raw}': {e}")))
}

fn date_key(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Raw row before amount/date/currency parsing.
struct DonationRow {
    branch_id: String,
    donor_id: Option<String>,
    amount: String,
    currency: String,
    date: String,
    is_anonymous: bool,
}

impl DonationRow {
    fn into_record(self) -> AnalyticsResult<DonationRecord> {
        Ok(DonationRecord {
            branch_id: self.branch_id,
            donor_id: self.donor_id,
            amount: parse_amount(&self.amount)?,
            currency: CurrencyCode::parse(&self.currency)?,
            date: parse_stored_date(&self.date)?,
            is_anonymous: self.is_anonymous,
        })
    }
}

impl LedgerStore {
    // ── Writes (ledger owner / demo seeding only) ──────────────

    pub fn insert_donation(&self, record: &DonationRecord) -> AnalyticsResult<i64> {
        self.conn.execute(
            "INSERT INTO donation
                 (branch_id, donor_id, amount, currency, donation_date, is_anonymous)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                record.branch_id,
                record.donor_id,
                record.amount.to_string(),
                record.currency.as_str(),
                date_key(record.date),
                record.is_anonymous,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Insert a batch in one transaction. Returns the number of rows written.
    pub fn insert_donations(&self, records: &[DonationRecord]) -> AnalyticsResult<usize> {
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO donation
                     (branch_id, donor_id, amount, currency, donation_date, is_anonymous)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for record in records {
                stmt.execute(params![
                    record.branch_id,
                    record.donor_id,
                    record.amount.to_string(),
                    record.currency.as_str(),
                    date_key(record.date),
                    record.is_anonymous,
                ])?;
            }
        }
        tx.commit()?;
        log::debug!("store: inserted {} donation(s)", records.len());
        Ok(records.len())
    }

    // ── Reads ──────────────────────────────────────────────────

    pub fn donation_count(&self, branch: &str) -> AnalyticsResult<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM donation WHERE branch_id = ?1",
            params![branch],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn branches(&self) -> AnalyticsResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT branch_id FROM donation ORDER BY branch_id ASC")?;
        let branches = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(branches)
    }

    pub fn currencies(&self, branch: &str) -> AnalyticsResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT currency FROM donation WHERE branch_id = ?1 ORDER BY currency ASC",
        )?;
        let currencies = stmt
            .query_map(params![branch], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(currencies)
    }
}

impl DonationSource for LedgerStore {
    fn list_donations(
        &self,
        branch: &str,
        currency: &CurrencyCode,
        range: &Period,
    ) -> AnalyticsResult<Vec<DonationRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT branch_id, donor_id, amount, currency, donation_date, is_anonymous
             FROM donation
             WHERE branch_id = ?1 AND currency = ?2
               AND donation_date >= ?3 AND donation_date <= ?4
             ORDER BY donation_date ASC, id ASC",
        )?;
        let rows = stmt
            .query_map(
                params![
                    branch,
                    currency.as_str(),
                    date_key(range.first_date()),
                    date_key(range.last_date()),
                ],
                |row| {
                    Ok(DonationRow {
                        branch_id: row.get(0)?,
                        donor_id: row.get(1)?,
                        amount: row.get(2)?,
                        currency: row.get(3)?,
                        date: row.get(4)?,
                        is_anonymous: row.get(5)?,
                    })
                },
            )?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(DonationRow::into_record).collect()
    }

    fn has_donation_before(
        &self,
        branch: &str,
        currency: &CurrencyCode,
        donor_id: &str,
        date: NaiveDate,
    ) -> AnalyticsResult<bool> {
        let found: bool = self.conn.query_row(
            "SELECT EXISTS(
                SELECT 1 FROM donation
                WHERE branch_id = ?1 AND currency = ?2 AND donor_id = ?3
                  AND is_anonymous = 0 AND donation_date < ?4
             )",
            params![branch, currency.as_str(), donor_id, date_key(date)],
            |row| row.get(0),
        )?;
        Ok(found)
    }

    fn average_donation_amount(
        &self,
        branch: &str,
        currency: &CurrencyCode,
        year: i32,
    ) -> AnalyticsResult<Decimal> {
        let mut stmt = self.conn.prepare(
            "SELECT amount FROM donation
             WHERE branch_id = ?1 AND currency = ?2
               AND donation_date >= ?3 AND donation_date <= ?4",
        )?;
        let amounts = stmt
            .query_map(
                params![
                    branch,
                    currency.as_str(),
                    format!("{year:04}-01-01"),
                    format!("{year:04}-12-31"),
                ],
                |row| row.get::<_, String>(0),
            )?
            .collect::<Result<Vec<_>, _>>()?;

        let mut sum = Decimal::ZERO;
        for raw in &amounts {
            sum += parse_amount(raw)?;
        }
        Ok(crate::ratio::mean(sum, amounts.len()))
    }
}

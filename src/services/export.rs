use crate::{
    errors::{AppError, AppResult},
    models::OnuDevice,
};
use chrono::NaiveDate;
use csv::{QuoteStyle, WriterBuilder};

const ONU_HEADERS: [&str; 11] = [
    "OLT",
    "PON Port",
    "ONU Name",
    "Router Name",
    "PPPoE Username",
    "MAC Address",
    "Serial Number",
    "RX Power",
    "TX Power",
    "Status",
    "Last Online",
];

pub fn onu_export_filename(date: NaiveDate) -> String {
    format!("onu-devices-{}.csv", date.format("%Y-%m-%d"))
}

/// ONU table as CSV with every field double-quoted.
pub fn onu_devices_csv(devices: &[OnuDevice]) -> AppResult<Vec<u8>> {
    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .from_writer(vec![]);

    writer.write_record(ONU_HEADERS).map_err(csv_error)?;

    for d in devices {
        let text = |v: &Option<String>| v.clone().unwrap_or_default();
        writer
            .write_record([
                d.olt_name.clone(),
                d.pon_port.clone(),
                text(&d.onu_name),
                text(&d.router_name),
                text(&d.pppoe_username),
                text(&d.mac_address),
                text(&d.serial_number),
                d.rx_power.map(|p| p.to_string()).unwrap_or_default(),
                d.tx_power.map(|p| p.to_string()).unwrap_or_default(),
                d.status.clone(),
                d.last_online.map(|t| t.to_rfc3339()).unwrap_or_default(),
            ])
            .map_err(csv_error)?;
    }

    writer
        .into_inner()
        .map_err(|e| AppError::Internal(format!("CSV export failed: {}", e)))
}

fn csv_error(e: csv::Error) -> AppError {
    AppError::Internal(format!("CSV export failed: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn device() -> OnuDevice {
        OnuDevice {
            id: Uuid::new_v4(),
            olt_name: "OLT-Mirpur".to_string(),
            pon_port: "0/1/3".to_string(),
            onu_name: Some("Rahim, House 12".to_string()),
            router_name: None,
            pppoe_username: Some("rahim12".to_string()),
            mac_address: Some("AA:BB:CC:DD:EE:FF".to_string()),
            serial_number: Some("HWTC1234ABCD".to_string()),
            rx_power: Some(dec!(-21.45)),
            tx_power: Some(dec!(2.10)),
            status: "online".to_string(),
            last_online: Some(Utc.with_ymd_and_hms(2024, 4, 2, 8, 30, 0).unwrap()),
        }
    }

    #[test]
    fn filename_uses_iso_date() {
        let date = NaiveDate::from_ymd_opt(2024, 4, 2).unwrap();
        assert_eq!(onu_export_filename(date), "onu-devices-2024-04-02.csv");
    }

    #[test]
    fn every_field_is_quoted() {
        let bytes = onu_devices_csv(&[device()]).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let mut lines = text.lines();

        assert_eq!(
            lines.next().unwrap(),
            r#""OLT","PON Port","ONU Name","Router Name","PPPoE Username","MAC Address","Serial Number","RX Power","TX Power","Status","Last Online""#
        );
        assert_eq!(
            lines.next().unwrap(),
            r#""OLT-Mirpur","0/1/3","Rahim, House 12","","rahim12","AA:BB:CC:DD:EE:FF","HWTC1234ABCD","-21.45","2.10","online","2024-04-02T08:30:00+00:00""#
        );
        assert!(lines.next().is_none());
    }

    #[test]
    fn empty_table_still_has_headers() {
        let text = String::from_utf8(onu_devices_csv(&[]).unwrap()).unwrap();
        assert_eq!(text.lines().count(), 1);
    }
}

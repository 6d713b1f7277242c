/// Returns how long the vault watcher sleeps before its next scan, based on
/// when a deposit vault was last created.
///
/// Fresh vaults are scanned often; the cadence relaxes to once a minute
/// when checkout is quiet.
pub fn scan_interval(
    last_activity: time::PrimitiveDateTime,
    now: time::PrimitiveDateTime,
) -> time::Duration {
    let idle_for = now - last_activity;
    match idle_for {
        d if d < time::Duration::minutes(2) => time::Duration::seconds(2),
        d if d < time::Duration::minutes(10) => time::Duration::seconds(10),
        d if d < time::Duration::minutes(30) => time::Duration::seconds(30),
        _ => time::Duration::seconds(60),
    }
}

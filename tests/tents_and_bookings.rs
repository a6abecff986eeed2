use chrono::NaiveDate;
use tkr_receipts::tents::{
    self, BOOKINGS_PER_PAGE, BookingQuery, BookingSortField, BookingStatus, TentStatus,
};

fn bookings() -> Vec<tents::Booking> {
    tents::sample_bookings(NaiveDate::from_ymd_opt(2025, 6, 15).unwrap())
}

#[test]
fn sample_bookings_are_stable_and_date_sorted() {
    let a = bookings();
    assert_eq!(a, bookings());
    assert_eq!(a.len(), 25);
    assert!(a.windows(2).all(|w| w[0].date >= w[1].date));
    assert!(a.iter().all(|b| (1..=8).contains(&b.duration)));
    assert!(a.iter().all(|b| b.created_at.date_naive().to_string() <= b.date));
}

#[test]
fn pagination_clamps_and_splits() {
    let all = bookings();
    let first = tents::query_bookings(&all, &BookingQuery::default());
    assert_eq!(first.matched, 25);
    assert_eq!(first.total_pages, 3);
    assert_eq!(first.rows.len(), BOOKINGS_PER_PAGE);

    let last = tents::query_bookings(&all, &BookingQuery { page: 99, ..Default::default() });
    assert_eq!(last.page, 3);
    assert_eq!(last.rows.len(), 5);

    let zero = tents::query_bookings(&all, &BookingQuery { page: 0, ..Default::default() });
    assert_eq!(zero.page, 1);
}

#[test]
fn search_matches_ids_and_contacts_case_insensitively() {
    let all = bookings();
    let query = BookingQuery {
        search: "bkg-00".into(),
        ..Default::default()
    };
    assert_eq!(tents::query_bookings(&all, &query).matched, 9);

    let by_tent = BookingQuery {
        search: "t2".into(),
        ..Default::default()
    };
    // T2, T20..T25
    assert_eq!(tents::query_bookings(&all, &by_tent).matched, 7);

    let none = BookingQuery {
        search: "zzz".into(),
        ..Default::default()
    };
    let page = tents::query_bookings(&all, &none);
    assert_eq!(page.matched, 0);
    assert_eq!(page.total_pages, 0);
    assert!(page.rows.is_empty());
}

#[test]
fn status_filter_and_sorting() {
    let all = bookings();
    let query = BookingQuery {
        status: Some(BookingStatus::Occupied),
        sort: BookingSortField::Duration,
        descending: false,
        ..Default::default()
    };
    let page = tents::query_bookings(&all, &query);
    assert!(page.matched > 0 && page.matched < 25);
    assert!(page.rows.iter().all(|b| b.status == BookingStatus::Occupied));
    assert!(page.rows.windows(2).all(|w| w[0].duration <= w[1].duration));
    assert_eq!("duration".parse::<BookingSortField>().unwrap(), BookingSortField::Duration);
}

#[test]
fn tent_filter_by_status() {
    let all = tents::sample_tents();
    let reserved = tents::filter_tents(&all, Some(TentStatus::Reserved));
    assert_eq!(reserved.len(), tents::tent_counts(&all).reserved);
    assert!(reserved.iter().all(|t| t.booked_by.as_deref().is_some_and(|c| c.starts_with("050"))));
    assert_eq!(tents::filter_tents(&all, None).len(), 48);
}

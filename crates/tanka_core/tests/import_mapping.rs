use tanka_core::{map_text, CsvFormat, EntryStatus, ImportContext, LINE_COUNT};

const LEGACY_ENTRY_CSV: &str = "短歌,メモ,ラベル,作成日,更新日,完成日
\"白鳥は
かなしからずや
空の青
海のあをにも
染まずただよふ\",若山牧水,\"名歌、 青;旅\",2023年4月5日,2023年4月6日,2023年4月7日
\"一行だけ\",,,,2024年1月2日,(未完成)
,,,,,
";

const LEGACY_SERIES_CSV: &str = "連作名,説明,作成日,更新日,1首目,2首目,3首目
春の連作,三首の予定,2024-3-9,,\"一首目\n二行目\",,\"三首目\"
,名前なし,,2024-12-1,,,
";

#[test]
fn legacy_entry_rows_map_to_entries() {
    let batch = map_text(LEGACY_ENTRY_CSV, &ImportContext::with_stamp(100));

    assert_eq!(batch.format, CsvFormat::LegacyEntry);
    assert_eq!(batch.entries.len(), 2);
    assert_eq!(batch.blank_rows, 1);
    assert!(batch.series.is_empty());

    let first = &batch.entries[0];
    assert_eq!(first.id, "import-100-1");
    assert_eq!(first.date, "2023-04-05");
    assert_eq!(first.lines.len(), LINE_COUNT);
    assert_eq!(first.lines[0], "白鳥は");
    assert_eq!(first.lines[4], "染まずただよふ");
    assert_eq!(first.tags, vec!["名歌", "青", "旅"]);
    assert_eq!(first.memo, "若山牧水");
    assert_eq!(first.status, EntryStatus::Published);
    assert!(first.series_id.is_empty());
    assert!(first.category.is_empty());

    let second = &batch.entries[1];
    assert_eq!(second.id, "import-100-2");
    assert_eq!(second.date, "2024-01-02");
    assert_eq!(second.lines, vec!["一行だけ", "", "", "", ""]);
    assert!(second.tags.is_empty());
    assert_eq!(second.status, EntryStatus::Unpublished);
}

#[test]
fn legacy_series_rows_map_to_series_with_members_in_column_order() {
    let batch = map_text(LEGACY_SERIES_CSV, &ImportContext::with_stamp(100));

    assert_eq!(batch.format, CsvFormat::LegacySeries);
    assert_eq!(batch.series.len(), 2);

    let spring = &batch.series[0];
    assert_eq!(spring.id, "series-100-1");
    assert_eq!(spring.name, "春の連作");
    assert_eq!(spring.plan_count, 0);
    assert_eq!(
        spring.entries,
        vec!["import-series-100-1-1", "import-series-100-1-3"]
    );

    let unnamed = &batch.series[1];
    assert_eq!(unnamed.name, "series-100-2");
    assert!(unnamed.entries.is_empty());

    assert_eq!(batch.entries.len(), 2);
    let first = &batch.entries[0];
    assert_eq!(first.date, "2024-03-09");
    assert_eq!(first.lines, vec!["一首目", "二行目", "", "", ""]);
    assert_eq!(first.series_id, "series-100-1");
    assert_eq!(first.status, EntryStatus::Unpublished);
    assert!(first.tags.is_empty() && first.memo.is_empty() && first.category.is_empty());
}

#[test]
fn native_rows_keep_ids_and_parse_tags_and_status() {
    let text = "id,date,line1,line2,line3,line4,line5,tags,category,seriesId,memo,status
a,2024-01-01,x,y,,,,haru; natsu ;,四季,s1,memo,published
b,2024-01-02,z,,,,,,,,,
";
    let batch = map_text(text, &ImportContext::with_stamp(1));

    assert_eq!(batch.format, CsvFormat::Native);
    assert_eq!(batch.entries.len(), 2);
    assert_eq!(batch.blank_rows, 0);

    let a = &batch.entries[0];
    assert_eq!(a.id, "a");
    assert_eq!(a.lines, vec!["x", "y", "", "", ""]);
    assert_eq!(a.tags, vec!["haru", "natsu"]);
    assert_eq!(a.category, "四季");
    assert_eq!(a.series_id, "s1");
    assert_eq!(a.status, EntryStatus::Published);

    assert_eq!(batch.entries[1].status, EntryStatus::Unpublished);
}

#[test]
fn header_only_or_empty_text_maps_nothing() {
    let ctx = ImportContext::with_stamp(1);
    assert!(map_text("", &ctx).entries.is_empty());
    assert!(map_text("短歌,メモ", &ctx).entries.is_empty());
}

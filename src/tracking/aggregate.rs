use crate::db::{ClickEvent, UrlCount};
use serde::Serialize;

/// Weight carried by every heatmap point. Overlapping clicks are not binned.
pub const POINT_VALUE: i64 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeatmapPoint {
    pub x: i64,
    pub y: i64,
    pub value: i64,
    pub viewport_w: i64,
    pub viewport_h: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeatmapView {
    pub points: Vec<HeatmapPoint>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageStat {
    pub url: String,
    pub click_count: i64,
}

pub fn heatmap_view(clicks: &[ClickEvent]) -> HeatmapView {
    let points = clicks
        .iter()
        .map(|click| HeatmapPoint {
            x: click.x,
            y: click.y,
            value: POINT_VALUE,
            viewport_w: click.viewport_w,
            viewport_h: click.viewport_h,
        })
        .collect::<Vec<_>>();

    HeatmapView { points }
}

pub fn stats_view(counts: Vec<UrlCount>) -> Vec<PageStat> {
    counts
        .into_iter()
        .map(|entry| PageStat {
            url: entry.url,
            click_count: entry.count,
        })
        .collect()
}

/// 绘图渲染
///
/// 把图表场景栅格化为 PNG。绘图页导出和报表的 Plots 工作表共用这里的实现，
/// 只画数据、网格和限值线，不渲染文字。
use image::codecs::png::PngEncoder;
use image::{ColorType, ImageEncoder, Rgb, RgbImage};

use crate::models::graph::AxisRange;
use crate::models::structs::PlotSeries;
use crate::utils::error::{AppError, AppResult};

/// 报表中曲线图片的尺寸
pub const REPORT_PLOT_WIDTH: u32 = 600;
pub const REPORT_PLOT_HEIGHT: u32 = 300;

/// 报表曲线的背景色
pub const REPORT_PLOT_BACKGROUND: &str = "#1e293b";
const REPORT_PLOT_FOREGROUND: &str = "#f8fafc";
const REPORT_SERIES_COLORS: [&str; 4] = ["#38bdf8", "#f97316", "#22c55e", "#e879f9"];

// 绘图区四周留白（像素）
const MARGIN_LEFT: u32 = 48;
const MARGIN_RIGHT: u32 = 16;
const MARGIN_TOP: u32 = 16;
const MARGIN_BOTTOM: u32 = 32;
const GRID_DIVISIONS: u32 = 5;

/// 解析 `#RRGGBB`
pub fn parse_hex_color(hex: &str) -> AppResult<Rgb<u8>> {
    let digits = hex.trim().trim_start_matches('#');
    if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(AppError::validation_error(format!("无效的颜色值: {}", hex)));
    }
    let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).unwrap_or(0);
    Ok(Rgb([channel(0), channel(2), channel(4)]))
}

/// 两种颜色按比例混合，用于网格线
fn blend(a: Rgb<u8>, b: Rgb<u8>, t: f64) -> Rgb<u8> {
    let mix = |x: u8, y: u8| (x as f64 * (1.0 - t) + y as f64 * t).round() as u8;
    Rgb([mix(a[0], b[0]), mix(a[1], b[1]), mix(a[2], b[2])])
}

/// 有限值的最小/最大值
pub fn data_range<'a, I>(values: I) -> Option<AxisRange>
where
    I: IntoIterator<Item = &'a f64>,
{
    let mut range: Option<AxisRange> = None;
    for &v in values.into_iter().filter(|v| v.is_finite()) {
        range = Some(match range {
            None => AxisRange { min: v, max: v },
            Some(r) => AxisRange {
                min: r.min.min(v),
                max: r.max.max(v),
            },
        });
    }
    range
}

/// 图层的绘制方式
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChartMark {
    /// 点，半径为像素
    Points { radius: f64 },
    /// 折线，线宽为像素
    Line { width: f64 },
    /// 柱，宽度为数据单位
    Bars { width: f64 },
}

/// 一组同色数据
#[derive(Debug, Clone)]
pub struct ChartLayer {
    pub color: Rgb<u8>,
    pub xs: Vec<f64>,
    pub ys: Vec<f64>,
    pub mark: ChartMark,
    /// 需要描边突出显示的点（离群点）
    pub highlight: Vec<bool>,
}

impl ChartLayer {
    pub fn new(color: Rgb<u8>, xs: Vec<f64>, ys: Vec<f64>, mark: ChartMark) -> Self {
        Self {
            color,
            xs,
            ys,
            mark,
            highlight: Vec::new(),
        }
    }
}

/// 水平参考线（规格上下限）
#[derive(Debug, Clone, Copy)]
pub struct HorizontalLine {
    pub y: f64,
    pub color: Rgb<u8>,
}

/// 完整的图表描述
#[derive(Debug, Clone)]
pub struct ChartScene {
    pub background: Rgb<u8>,
    pub foreground: Rgb<u8>,
    pub x_range: AxisRange,
    pub y_range: AxisRange,
    pub layers: Vec<ChartLayer>,
    pub hlines: Vec<HorizontalLine>,
    pub show_grid: bool,
}

impl ChartScene {
    /// 由图层数据自动计算坐标范围，两端各留 margin_percent
    pub fn fit(
        background: Rgb<u8>,
        foreground: Rgb<u8>,
        layers: Vec<ChartLayer>,
        hlines: Vec<HorizontalLine>,
        margin_percent: f64,
    ) -> Self {
        let x_range = data_range(layers.iter().flat_map(|l| l.xs.iter()));
        let y_values = layers.iter().flat_map(|l| l.ys.iter()).chain(hlines.iter().map(|h| &h.y));
        let y_range = data_range(y_values);
        Self {
            background,
            foreground,
            x_range: pad_range(x_range.unwrap_or(AxisRange { min: 0.0, max: 1.0 }), margin_percent),
            y_range: pad_range(y_range.unwrap_or(AxisRange { min: 0.0, max: 1.0 }), margin_percent),
            layers,
            hlines,
            show_grid: true,
        }
    }
}

/// 按百分比扩展范围；零宽范围扩展为 ±1
pub fn pad_range(range: AxisRange, margin_percent: f64) -> AxisRange {
    let span = range.max - range.min;
    if span <= 0.0 || !span.is_finite() {
        return AxisRange {
            min: range.min - 1.0,
            max: range.max + 1.0,
        };
    }
    let pad = span * margin_percent / 100.0;
    AxisRange {
        min: range.min - pad,
        max: range.max + pad,
    }
}

/// 数据坐标到像素坐标的映射
struct Viewport {
    left: f64,
    top: f64,
    width: f64,
    height: f64,
    x_range: AxisRange,
    y_range: AxisRange,
}

impl Viewport {
    fn px(&self, x: f64) -> f64 {
        let span = (self.x_range.max - self.x_range.min).max(f64::EPSILON);
        self.left + (x - self.x_range.min) / span * self.width
    }

    fn py(&self, y: f64) -> f64 {
        let span = (self.y_range.max - self.y_range.min).max(f64::EPSILON);
        self.top + self.height - (y - self.y_range.min) / span * self.height
    }

    fn contains(&self, px: f64, py: f64) -> bool {
        px >= self.left && px <= self.left + self.width && py >= self.top && py <= self.top + self.height
    }
}

pub struct PlotRenderer;

impl PlotRenderer {
    /// 栅格化场景
    pub fn render(scene: &ChartScene, width: u32, height: u32) -> AppResult<RgbImage> {
        if width <= MARGIN_LEFT + MARGIN_RIGHT || height <= MARGIN_TOP + MARGIN_BOTTOM {
            return Err(AppError::image_error(format!("图片尺寸过小: {}x{}", width, height)));
        }
        let mut img = RgbImage::from_pixel(width, height, scene.background);
        let view = Viewport {
            left: MARGIN_LEFT as f64,
            top: MARGIN_TOP as f64,
            width: (width - MARGIN_LEFT - MARGIN_RIGHT) as f64,
            height: (height - MARGIN_TOP - MARGIN_BOTTOM) as f64,
            x_range: scene.x_range,
            y_range: scene.y_range,
        };

        if scene.show_grid {
            let grid = blend(scene.background, scene.foreground, 0.2);
            for i in 1..GRID_DIVISIONS {
                let fx = view.left + view.width * i as f64 / GRID_DIVISIONS as f64;
                let fy = view.top + view.height * i as f64 / GRID_DIVISIONS as f64;
                draw_line(&mut img, (fx, view.top), (fx, view.top + view.height), 1.0, grid);
                draw_line(&mut img, (view.left, fy), (view.left + view.width, fy), 1.0, grid);
            }
        }

        // 坐标轴
        let axis = scene.foreground;
        let (l, t, r, b) = (view.left, view.top, view.left + view.width, view.top + view.height);
        draw_line(&mut img, (l, b), (r, b), 1.0, axis);
        draw_line(&mut img, (l, t), (l, b), 1.0, axis);

        for layer in &scene.layers {
            draw_layer(&mut img, &view, layer, scene.foreground);
        }

        for line in &scene.hlines {
            let y = view.py(line.y);
            if y >= t && y <= b {
                draw_dashed_hline(&mut img, l, r, y, line.color);
            }
        }

        Ok(img)
    }

    /// 渲染并编码为 PNG
    pub fn render_png(scene: &ChartScene, width: u32, height: u32) -> AppResult<Vec<u8>> {
        let img = Self::render(scene, width, height)?;
        encode_png(&img)
    }

    /// 报表用的曲线图
    pub fn render_series_png(series: &[PlotSeries], width: u32, height: u32) -> AppResult<Vec<u8>> {
        if series.iter().all(|s| s.x.is_empty() || s.y.is_empty()) {
            return Err(AppError::image_error("曲线数据为空"));
        }
        let background = parse_hex_color(REPORT_PLOT_BACKGROUND)?;
        let foreground = parse_hex_color(REPORT_PLOT_FOREGROUND)?;
        let mut layers = Vec::with_capacity(series.len());
        for (i, s) in series.iter().enumerate() {
            let color = parse_hex_color(REPORT_SERIES_COLORS[i % REPORT_SERIES_COLORS.len()])?;
            let n = s.x.len().min(s.y.len());
            layers.push(ChartLayer::new(
                color,
                s.x[..n].to_vec(),
                s.y[..n].to_vec(),
                ChartMark::Line { width: 2.0 },
            ));
        }
        let scene = ChartScene::fit(background, foreground, layers, Vec::new(), 5.0);
        Self::render_png(&scene, width, height)
    }
}

pub fn encode_png(img: &RgbImage) -> AppResult<Vec<u8>> {
    let mut bytes = Vec::new();
    PngEncoder::new(&mut bytes).write_image(img.as_raw(), img.width(), img.height(), ColorType::Rgb8)?;
    Ok(bytes)
}

fn draw_layer(img: &mut RgbImage, view: &Viewport, layer: &ChartLayer, outline: Rgb<u8>) {
    let points: Vec<(f64, f64, bool)> = layer
        .xs
        .iter()
        .zip(&layer.ys)
        .enumerate()
        .filter(|(_, (x, y))| x.is_finite() && y.is_finite())
        .map(|(i, (x, y))| (*x, *y, layer.highlight.get(i).copied().unwrap_or(false)))
        .collect();

    match layer.mark {
        ChartMark::Points { radius } => {
            for (x, y, highlighted) in points {
                let (px, py) = (view.px(x), view.py(y));
                if !view.contains(px, py) {
                    continue;
                }
                if highlighted {
                    fill_circle(img, px, py, radius + 2.0, outline);
                }
                fill_circle(img, px, py, radius, layer.color);
            }
        }
        ChartMark::Line { width } => {
            for pair in points.windows(2) {
                let a = (view.px(pair[0].0), view.py(pair[0].1));
                let b = (view.px(pair[1].0), view.py(pair[1].1));
                draw_line(img, a, b, width, layer.color);
            }
        }
        ChartMark::Bars { width } => {
            let base = view.py(0.0_f64.clamp(view.y_range.min, view.y_range.max));
            for (x, y, _) in points {
                let x0 = view.px(x - width / 2.0);
                let x1 = view.px(x + width / 2.0);
                fill_rect(img, x0, base.min(view.py(y)), x1, base.max(view.py(y)), layer.color);
            }
        }
    }
}

fn put(img: &mut RgbImage, x: i64, y: i64, color: Rgb<u8>) {
    if x >= 0 && y >= 0 && (x as u32) < img.width() && (y as u32) < img.height() {
        img.put_pixel(x as u32, y as u32, color);
    }
}

fn fill_circle(img: &mut RgbImage, cx: f64, cy: f64, radius: f64, color: Rgb<u8>) {
    let r = radius.max(0.5);
    let (x0, x1) = ((cx - r).floor() as i64, (cx + r).ceil() as i64);
    let (y0, y1) = ((cy - r).floor() as i64, (cy + r).ceil() as i64);
    for y in y0..=y1 {
        for x in x0..=x1 {
            let (dx, dy) = (x as f64 - cx, y as f64 - cy);
            if dx * dx + dy * dy <= r * r {
                put(img, x, y, color);
            }
        }
    }
}

fn fill_rect(img: &mut RgbImage, x0: f64, y0: f64, x1: f64, y1: f64, color: Rgb<u8>) {
    for y in y0.round() as i64..=y1.round() as i64 {
        for x in x0.round() as i64..=x1.round() as i64 {
            put(img, x, y, color);
        }
    }
}

fn draw_line(img: &mut RgbImage, a: (f64, f64), b: (f64, f64), width: f64, color: Rgb<u8>) {
    let steps = (b.0 - a.0).abs().max((b.1 - a.1).abs()).ceil().max(1.0) as usize;
    let half = (width / 2.0).max(0.5);
    for i in 0..=steps {
        let t = i as f64 / steps as f64;
        let x = a.0 + (b.0 - a.0) * t;
        let y = a.1 + (b.1 - a.1) * t;
        if half <= 0.5 {
            put(img, x.round() as i64, y.round() as i64, color);
        } else {
            fill_circle(img, x, y, half, color);
        }
    }
}

fn draw_dashed_hline(img: &mut RgbImage, x0: f64, x1: f64, y: f64, color: Rgb<u8>) {
    const DASH: i64 = 8;
    let row = y.round() as i64;
    for x in x0.round() as i64..=x1.round() as i64 {
        if (x / DASH) % 2 == 0 {
            put(img, x, row, color);
            put(img, x, row + 1, color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_colors() {
        assert_eq!(parse_hex_color("#1e293b").unwrap(), Rgb([0x1e, 0x29, 0x3b]));
        assert_eq!(parse_hex_color("FFFFFF").unwrap(), Rgb([255, 255, 255]));
        assert!(parse_hex_color("#12345").is_err());
        assert!(parse_hex_color("#gg0000").is_err());
    }

    #[test]
    fn ranges_skip_nan_and_pad() {
        let r = data_range(&[0.0, f64::NAN, 4.0]).unwrap();
        assert_eq!(r, AxisRange { min: 0.0, max: 4.0 });
        assert_eq!(pad_range(r, 25.0), AxisRange { min: -1.0, max: 5.0 });
        assert_eq!(pad_range(AxisRange { min: 2.0, max: 2.0 }, 10.0), AxisRange { min: 1.0, max: 3.0 });
        assert!(data_range(&[f64::NAN]).is_none());
    }

    #[test]
    fn render_draws_background_points_and_limits() {
        let bg = parse_hex_color("#ffffff").unwrap();
        let red = Rgb([255, 0, 0]);
        let blue = Rgb([0, 0, 255]);
        let layer = ChartLayer::new(red, vec![0.0, 1.0, 2.0], vec![0.0, 1.0, 2.0], ChartMark::Points { radius: 4.0 });
        let scene = ChartScene::fit(bg, Rgb([0, 0, 0]), vec![layer], vec![HorizontalLine { y: 1.5, color: blue }], 10.0);
        let img = PlotRenderer::render(&scene, 400, 300).unwrap();

        assert_eq!(*img.get_pixel(1, 1), bg);
        assert!(img.pixels().any(|p| *p == red));
        assert!(img.pixels().any(|p| *p == blue));
    }

    #[test]
    fn report_plot_is_png() {
        let series = vec![PlotSeries {
            x: vec![0.0, 1.0, 2.0],
            y: vec![0.0, 4.0, 1.0],
            label: None,
        }];
        let png = PlotRenderer::render_series_png(&series, REPORT_PLOT_WIDTH, REPORT_PLOT_HEIGHT).unwrap();
        assert_eq!(&png[1..4], b"PNG");

        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!(decoded.width(), REPORT_PLOT_WIDTH);
        assert_eq!(decoded.height(), REPORT_PLOT_HEIGHT);
        assert!(PlotRenderer::render_series_png(&[], 100, 100).is_err());
    }

    #[test]
    fn tiny_canvas_is_rejected() {
        let scene = ChartScene::fit(Rgb([0, 0, 0]), Rgb([255, 255, 255]), Vec::new(), Vec::new(), 0.0);
        assert!(PlotRenderer::render(&scene, 10, 10).is_err());
    }
}

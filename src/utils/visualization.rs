//! Planning scene plots
//!
//! Collects lane, lattice, obstacle and trajectory layers and renders them
//! into a single gnuplot axes on save.

use gnuplot::{AutoOption, AxesCommon, Caption, Color, Figure, LineWidth, PointSize, PointSymbol};

use crate::common::trajectory::PlannedTrajectory;
use crate::common::traits::LaneReference;
use crate::common::types::{Point2D, Pose, TrajectoryPoint};
use crate::obstacles::{DynamicObstacle, StaticObstacle};

/// Color palette for consistent styling
pub mod colors {
    pub const BLACK: &str = "#000000";
    pub const RED: &str = "#FF0000";
    pub const GREEN: &str = "#00AA00";
    pub const BLUE: &str = "#0000FF";
    pub const ORANGE: &str = "#FFA500";
    pub const GRAY: &str = "#808080";

    pub const LANE: &str = GRAY;
    pub const LATTICE: &str = "#9999CC";
    pub const STATIC_OBSTACLE: &str = BLACK;
    pub const DYNAMIC_OBSTACLE: &str = ORANGE;
    pub const PLAN: &str = RED;
    pub const DRIVEN: &str = BLUE;
    pub const VEHICLE: &str = GREEN;
}

#[derive(Debug, Clone)]
pub struct PathStyle {
    pub color: String,
    pub line_width: f64,
    pub caption: String,
}

impl PathStyle {
    pub fn new(color: &str, caption: &str) -> Self {
        Self {
            color: color.to_string(),
            line_width: 2.0,
            caption: caption.to_string(),
        }
    }

    pub fn with_line_width(mut self, width: f64) -> Self {
        self.line_width = width;
        self
    }
}

#[derive(Debug, Clone)]
pub struct PointStyle {
    pub color: String,
    pub size: f64,
    pub symbol: char,
    pub caption: String,
}

impl PointStyle {
    pub fn new(color: &str, caption: &str) -> Self {
        Self {
            color: color.to_string(),
            size: 1.0,
            symbol: 'O',
            caption: caption.to_string(),
        }
    }

    pub fn with_size(mut self, size: f64) -> Self {
        self.size = size;
        self
    }

    pub fn with_symbol(mut self, symbol: char) -> Self {
        self.symbol = symbol;
        self
    }
}

#[derive(Debug, Clone)]
enum Layer {
    Lines {
        x: Vec<f64>,
        y: Vec<f64>,
        style: PathStyle,
    },
    Points {
        x: Vec<f64>,
        y: Vec<f64>,
        style: PointStyle,
    },
}

fn unzip(points: impl IntoIterator<Item = Point2D>) -> (Vec<f64>, Vec<f64>) {
    points.into_iter().map(|p| (p.x, p.y)).unzip()
}

pub struct Visualizer {
    title: String,
    x_label: String,
    y_label: String,
    aspect_ratio: Option<f64>,
    layers: Vec<Layer>,
}

impl Visualizer {
    pub fn new() -> Self {
        Self {
            title: String::new(),
            x_label: "X [m]".to_string(),
            y_label: "Y [m]".to_string(),
            aspect_ratio: Some(1.0),
            layers: Vec::new(),
        }
    }

    pub fn set_title(&mut self, title: &str) -> &mut Self {
        self.title = title.to_string();
        self
    }

    pub fn set_aspect_ratio(&mut self, ratio: Option<f64>) -> &mut Self {
        self.aspect_ratio = ratio;
        self
    }

    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    pub fn plot_line(&mut self, points: &[Point2D], style: &PathStyle) -> &mut Self {
        let (x, y) = unzip(points.iter().copied());
        self.layers.push(Layer::Lines {
            x,
            y,
            style: style.clone(),
        });
        self
    }

    pub fn plot_points(&mut self, points: &[Point2D], style: &PointStyle) -> &mut Self {
        let (x, y) = unzip(points.iter().copied());
        self.layers.push(Layer::Points {
            x,
            y,
            style: style.clone(),
        });
        self
    }

    /// Lane centerline and its edges at `half_width` between two stations
    pub fn plot_lane(
        &mut self,
        lane: &dyn LaneReference,
        start: f64,
        end: f64,
        half_width: f64,
    ) -> &mut Self {
        let num = ((end - start) / 1.0).ceil().max(1.0) as usize + 1;
        let samples = lane.sample_stations(start, num, (end - start) / (num - 1) as f64);
        let center: Vec<Point2D> = samples.iter().map(|s| s.pose.position()).collect();
        let left: Vec<Point2D> = samples.iter().map(|s| s.offset(half_width)).collect();
        let right: Vec<Point2D> = samples.iter().map(|s| s.offset(-half_width)).collect();
        let edge = PathStyle::new(colors::LANE, "").with_line_width(1.0);
        self.plot_line(&center, &PathStyle::new(colors::LANE, "Lane").with_line_width(1.0))
            .plot_line(&left, &edge)
            .plot_line(&right, &edge)
    }

    pub fn plot_lattice(&mut self, nodes: &[Pose]) -> &mut Self {
        let points: Vec<Point2D> = nodes.iter().map(|n| n.position()).collect();
        self.plot_points(
            &points,
            &PointStyle::new(colors::LATTICE, "Lattice")
                .with_size(0.5)
                .with_symbol('o'),
        )
    }

    pub fn plot_static_obstacle(&mut self, obstacle: &StaticObstacle) -> &mut Self {
        let mut outline = obstacle.vertices(0.0, 0.0).to_vec();
        outline.push(outline[0]);
        self.plot_line(&outline, &PathStyle::new(colors::STATIC_OBSTACLE, ""))
    }

    /// Footprint at `t0` and the area swept until `t1`
    pub fn plot_dynamic_obstacle(&mut self, obstacle: &DynamicObstacle, t0: f64, t1: f64) -> &mut Self {
        let mut now = obstacle.vertices_in_time_range(t0, t0, 0.0, 0.0).to_vec();
        now.push(now[0]);
        let mut swept = obstacle.vertices_in_time_range(t0, t1, 0.0, 0.0).to_vec();
        swept.push(swept[0]);
        self.plot_line(&now, &PathStyle::new(colors::DYNAMIC_OBSTACLE, ""))
            .plot_line(
                &swept,
                &PathStyle::new(colors::DYNAMIC_OBSTACLE, "").with_line_width(1.0),
            )
    }

    pub fn plot_trajectory_points(&mut self, points: &[TrajectoryPoint], style: &PathStyle) -> &mut Self {
        let positions: Vec<Point2D> = points.iter().map(|p| p.pose.position()).collect();
        self.plot_line(&positions, style)
    }

    pub fn plot_trajectory(&mut self, trajectory: &PlannedTrajectory) -> &mut Self {
        self.plot_trajectory_points(trajectory.points(), &PathStyle::new(colors::PLAN, "Plan"))
    }

    /// Vehicle position with a heading tick
    pub fn plot_vehicle(&mut self, pose: &Pose, size: f64) -> &mut Self {
        let tip = Point2D::new(
            pose.x + size * pose.rot.cos(),
            pose.y + size * pose.rot.sin(),
        );
        self.plot_points(
            &[pose.position()],
            &PointStyle::new(colors::VEHICLE, "Vehicle").with_size(1.5),
        )
        .plot_line(&[pose.position(), tip], &PathStyle::new(colors::VEHICLE, ""))
    }

    pub fn save_png(&mut self, path: &str, width: u32, height: u32) -> Result<(), String> {
        let mut figure = self.render();
        figure.save_to_png(path, width, height).map_err(|e| e.to_string())
    }

    fn render(&self) -> Figure {
        let mut figure = Figure::new();
        let axes = figure.axes2d();
        if !self.title.is_empty() {
            axes.set_title(&self.title, &[]);
        }
        axes.set_x_label(&self.x_label, &[]);
        axes.set_y_label(&self.y_label, &[]);
        if let Some(ratio) = self.aspect_ratio {
            axes.set_aspect_ratio(AutoOption::Fix(ratio));
        }
        for layer in &self.layers {
            match layer {
                Layer::Lines { x, y, style } => {
                    axes.lines(
                        x,
                        y,
                        &[
                            Caption(&style.caption),
                            Color(&style.color),
                            LineWidth(style.line_width),
                        ],
                    );
                }
                Layer::Points { x, y, style } => {
                    axes.points(
                        x,
                        y,
                        &[
                            Caption(&style.caption),
                            Color(&style.color),
                            PointSymbol(style.symbol),
                            PointSize(style.size),
                        ],
                    );
                }
            }
        }
        figure
    }
}

impl Default for Visualizer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lane::LanePath;

    #[test]
    fn test_scene_layers() {
        let lane = LanePath::new(vec![Point2D::new(0.0, 0.0), Point2D::new(50.0, 0.0)]).unwrap();
        let obstacle = StaticObstacle::new(Point2D::new(20.0, 0.0), 0.0, 4.0, 2.0).unwrap();
        let mut vis = Visualizer::new();
        vis.set_title("scene")
            .plot_lane(&lane, 0.0, 40.0, 1.85)
            .plot_static_obstacle(&obstacle)
            .plot_vehicle(&Pose::origin(), 2.0);
        // Three lane lines, one outline, vehicle point and heading
        assert_eq!(vis.num_layers(), 6);
    }

    #[test]
    fn test_lattice_layer_style() {
        let nodes = [Pose::new(7.5, -3.7, 0.0), Pose::new(7.5, 0.0, 0.0), Pose::new(7.5, 3.7, 0.0)];
        let mut vis = Visualizer::new();
        vis.set_aspect_ratio(None).plot_lattice(&nodes);
        assert_eq!(vis.aspect_ratio, None);
        match &vis.layers[0] {
            Layer::Points { x, y, style } => {
                assert_eq!(x.len(), 3);
                assert!((y[2] - 3.7).abs() < 1e-12);
                assert_eq!(style.symbol, 'o');
                assert_eq!(style.size, 0.5);
            }
            other => panic!("unexpected layer {:?}", other),
        }
    }

    #[test]
    fn test_path_style() {
        let style = PathStyle::new(colors::RED, "Test Path").with_line_width(3.0);
        assert_eq!(style.line_width, 3.0);
        assert_eq!(style.color, colors::RED);
    }
}

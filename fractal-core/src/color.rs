/// An RGBA color with `f32` channels in `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

impl Color {
    pub const WHITE: Self = Self::rgb(1.0, 1.0, 1.0);

    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Linear interpolation between `self` (at `t = 0`) and `other` (at `t = 1`).
    pub fn lerp(self, other: Self, t: f32) -> Self {
        Self {
            r: self.r + (other.r - self.r) * t,
            g: self.g + (other.g - self.g) * t,
            b: self.b + (other.b - self.b) * t,
            a: self.a + (other.a - self.a) * t,
        }
    }
}

/// A piecewise-linear color gradient over `[0, 1]`.
///
/// Stops are `(position, color)` pairs kept sorted by position.
/// Evaluation clamps: below the first stop the first color is
/// returned, above the last stop the last color.
#[derive(Clone, Debug)]
pub struct Gradient {
    stops: Vec<(f32, Color)>,
}

impl Gradient {
    /// Creates a gradient from the given stops, sorting them by position.
    ///
    /// ### Panics
    /// Panics if `stops` is empty.
    pub fn new(mut stops: Vec<(f32, Color)>) -> Self {
        assert!(!stops.is_empty(), "gradient needs at least one stop");
        stops.sort_by(|a, b| a.0.total_cmp(&b.0));
        Self { stops }
    }

    /// A gradient that fades linearly from `a` at 0 to `b` at 1.
    pub fn linear(a: Color, b: Color) -> Self {
        Self::new(vec![(0.0, a), (1.0, b)])
    }

    /// Samples the gradient at `t`, clamping outside `[first, last]` stop positions.
    pub fn evaluate(&self, t: f32) -> Color {
        let first = self.stops[0];
        if t <= first.0 {
            return first.1;
        }
        for pair in self.stops.windows(2) {
            let (p0, c0) = pair[0];
            let (p1, c1) = pair[1];
            if t <= p1 {
                let span = p1 - p0;
                if span <= 0.0 {
                    return c1;
                }
                return c0.lerp(c1, (t - p0) / span);
            }
        }
        self.stops[self.stops.len() - 1].1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lerp_blends_channels() {
        let a = Color::rgba(0.0, 0.2, 1.0, 1.0);
        let b = Color::rgba(1.0, 0.2, 0.0, 0.0);
        let mid = a.lerp(b, 0.5);
        assert_eq!(mid, Color::rgba(0.5, 0.2, 0.5, 0.5));
    }

    #[test]
    fn evaluate_returns_endpoint_colors() {
        let g = Gradient::linear(Color::rgb(1.0, 0.0, 0.0), Color::rgb(0.0, 0.0, 1.0));
        assert_eq!(g.evaluate(0.0), Color::rgb(1.0, 0.0, 0.0));
        assert_eq!(g.evaluate(1.0), Color::rgb(0.0, 0.0, 1.0));
    }

    #[test]
    fn evaluate_clamps_outside_range() {
        let g = Gradient::linear(Color::rgb(1.0, 0.0, 0.0), Color::rgb(0.0, 0.0, 1.0));
        assert_eq!(g.evaluate(-2.0), Color::rgb(1.0, 0.0, 0.0));
        assert_eq!(g.evaluate(3.0), Color::rgb(0.0, 0.0, 1.0));
    }

    #[test]
    fn evaluate_interpolates_between_inner_stops() {
        let g = Gradient::new(vec![
            (0.0, Color::rgb(0.0, 0.0, 0.0)),
            (0.5, Color::rgb(1.0, 1.0, 1.0)),
            (1.0, Color::rgb(0.0, 0.0, 0.0)),
        ]);
        assert_eq!(g.evaluate(0.25), Color::rgb(0.5, 0.5, 0.5));
        assert_eq!(g.evaluate(0.75), Color::rgb(0.5, 0.5, 0.5));
    }

    #[test]
    fn stops_are_sorted_on_construction() {
        let g = Gradient::new(vec![
            (1.0, Color::rgb(0.0, 1.0, 0.0)),
            (0.0, Color::rgb(1.0, 0.0, 0.0)),
        ]);
        assert_eq!(g.evaluate(0.0), Color::rgb(1.0, 0.0, 0.0));
        assert_eq!(g.evaluate(1.0), Color::rgb(0.0, 1.0, 0.0));
    }

    #[test]
    #[should_panic]
    fn empty_gradient_panics() {
        let _ = Gradient::new(Vec::new());
    }
}

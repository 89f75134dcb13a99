use glam::Vec3;

const ARC_LENGTH_DIVISIONS: usize = 200;

/// Closed uniform Catmull-Rom curve through a ring of control points.
///
/// `point` samples by curve parameter, `point_at` by normalized arc length so
/// that equal steps of `u` cover equal distances along the path.
#[derive(Debug, Clone)]
pub struct CatmullRomCurve {
    points: Vec<Vec3>,
    arc_lengths: Vec<f32>,
}

impl CatmullRomCurve {
    pub fn closed(points: Vec<Vec3>) -> Self {
        let mut curve = Self {
            points,
            arc_lengths: Vec::new(),
        };
        curve.arc_lengths = curve.compute_arc_lengths();
        curve
    }

    pub fn control_points(&self) -> &[Vec3] {
        &self.points
    }

    pub fn length(&self) -> f32 {
        self.arc_lengths.last().copied().unwrap_or(0.0)
    }

    pub fn point(&self, t: f32) -> Vec3 {
        let n = self.points.len();
        match n {
            0 => return Vec3::ZERO,
            1 => return self.points[0],
            _ => {}
        }

        let p = n as f32 * t.rem_euclid(1.0);
        let index = (p.floor() as usize).min(n - 1);
        let weight = p - index as f32;

        let p0 = self.points[(index + n - 1) % n];
        let p1 = self.points[index];
        let p2 = self.points[(index + 1) % n];
        let p3 = self.points[(index + 2) % n];

        let w2 = weight * weight;
        let w3 = w2 * weight;
        0.5 * ((2.0 * p1)
            + (p2 - p0) * weight
            + (2.0 * p0 - 5.0 * p1 + 4.0 * p2 - p3) * w2
            + (3.0 * p1 - p0 - 3.0 * p2 + p3) * w3)
    }

    pub fn point_at(&self, u: f32) -> Vec3 {
        self.point(self.arc_to_parameter(u))
    }

    pub fn tangent_at(&self, u: f32) -> Vec3 {
        let t = self.arc_to_parameter(u);
        let delta = 0.0001;
        let ahead = self.point(t + delta);
        let behind = self.point(t - delta);
        (ahead - behind).normalize_or_zero()
    }

    fn arc_to_parameter(&self, u: f32) -> f32 {
        let total = self.length();
        if total <= 0.0 {
            return u;
        }

        let u = u.clamp(0.0, 1.0);
        let target = u * total;
        let lengths = &self.arc_lengths;

        let i = match lengths.binary_search_by(|l| l.total_cmp(&target)) {
            Ok(i) => i,
            Err(i) => i.saturating_sub(1),
        }
        .min(ARC_LENGTH_DIVISIONS - 1);

        let segment = lengths[i + 1] - lengths[i];
        let fraction = if segment > 0.0 {
            (target - lengths[i]) / segment
        } else {
            0.0
        };

        (i as f32 + fraction) / ARC_LENGTH_DIVISIONS as f32
    }

    fn compute_arc_lengths(&self) -> Vec<f32> {
        let mut lengths = Vec::with_capacity(ARC_LENGTH_DIVISIONS + 1);
        let mut sum = 0.0;
        let mut last = self.point(0.0);
        lengths.push(0.0);

        for i in 1..=ARC_LENGTH_DIVISIONS {
            let current = self.point(i as f32 / ARC_LENGTH_DIVISIONS as f32);
            sum += current.distance(last);
            lengths.push(sum);
            last = current;
        }

        lengths
    }
}

// src/tracking.rs - Hand landmarks, pinch classification and hand slot tracking
use std::sync::Arc;

use image::RgbaImage;
use nalgebra::Point2;
use tracing::trace;

use crate::config::SlotAssignment;
use crate::mapper::CoordinateMapper;

/// MediaPipe hand landmark indices.
pub mod landmarks {
    pub const WRIST: usize = 0;
    pub const THUMB_TIP: usize = 4;
    pub const INDEX_FINGER_TIP: usize = 8;
    pub const COUNT: usize = 21;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: Option<f32>,
}

impl Landmark {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y, z: None }
    }
}

/// One detected hand for one frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HandObservation {
    pub landmarks: Vec<Landmark>,
}

impl HandObservation {
    pub fn new(landmarks: Vec<Landmark>) -> Self {
        Self { landmarks }
    }

    pub fn point(&self, index: usize) -> Option<&Landmark> {
        self.landmarks.get(index)
    }
}

/// Everything the landmark source delivers for one video frame.
#[derive(Debug, Clone, Default)]
pub struct LandmarkFrame {
    pub image: Option<Arc<RgbaImage>>,
    pub hands: Vec<HandObservation>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandPose {
    /// Index fingertip in render space.
    pub fingertip: Point2<f32>,
    pub thumb_tip: Point2<f32>,
    pub pinch_distance: f32,
    pub is_shooting: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct GestureClassifier {
    threshold_px: f32,
}

impl GestureClassifier {
    pub fn new(threshold_px: f32) -> Self {
        Self { threshold_px }
    }

    /// Returns `None` when the hand lacks either fingertip landmark.
    pub fn classify(&self, hand: &HandObservation, mapper: &CoordinateMapper) -> Option<HandPose> {
        let index_tip = hand.point(landmarks::INDEX_FINGER_TIP)?;
        let thumb_tip = hand.point(landmarks::THUMB_TIP)?;

        let fingertip = mapper.to_canvas(index_tip.x, index_tip.y);
        let thumb = mapper.to_canvas(thumb_tip.x, thumb_tip.y);
        Some(self.classify_points(fingertip, thumb))
    }

    pub fn classify_points(&self, fingertip: Point2<f32>, thumb_tip: Point2<f32>) -> HandPose {
        let pinch_distance = nalgebra::distance(&fingertip, &thumb_tip);
        HandPose {
            fingertip,
            thumb_tip,
            pinch_distance,
            is_shooting: pinch_distance < self.threshold_px,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(pub u64);

impl std::fmt::Display for SlotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Gives each observed hand a slot identity for the current frame.
///
/// Positional mode uses the hand's index in the detector output, which
/// misattributes state when the detector reorders hands. Nearest mode matches
/// hands against last frame's anchors (greedy, closest pair first), preferring
/// pairs within the match radius. Hands left over once every previous slot is
/// taken get fresh slots; slots left over expire.
pub struct SlotTracker {
    mode: SlotAssignment,
    match_radius_px: f32,
    next_id: u64,
    previous: Vec<(SlotId, Point2<f32>)>,
}

impl SlotTracker {
    pub fn new(mode: SlotAssignment, match_radius_px: f32) -> Self {
        Self {
            mode,
            match_radius_px,
            next_id: 0,
            previous: Vec::new(),
        }
    }

    /// Point used to follow a hand between frames, in render space.
    pub fn anchor(hand: &HandObservation, mapper: &CoordinateMapper) -> Option<Point2<f32>> {
        hand.point(landmarks::INDEX_FINGER_TIP)
            .or_else(|| hand.point(landmarks::WRIST))
            .map(|lm| mapper.to_canvas(lm.x, lm.y))
    }

    /// One entry per anchor; `None` means the hand could not be tracked this frame.
    pub fn assign(&mut self, anchors: &[Option<Point2<f32>>]) -> Vec<Option<SlotId>> {
        match self.mode {
            SlotAssignment::Positional => (0..anchors.len())
                .map(|i| Some(SlotId(i as u64)))
                .collect(),
            SlotAssignment::Nearest => self.assign_nearest(anchors),
        }
    }

    fn assign_nearest(&mut self, anchors: &[Option<Point2<f32>>]) -> Vec<Option<SlotId>> {
        // Pairs inside the radius are matched first; leftover slots then go
        // to leftover hands regardless of distance, so a hand that stays in
        // view keeps its slot however fast it moves.
        let mut pairs = Vec::new();
        for (hand, anchor) in anchors.iter().enumerate() {
            let Some(anchor) = anchor else { continue };
            for (prev, (_, last)) in self.previous.iter().enumerate() {
                let d = nalgebra::distance(anchor, last);
                pairs.push((d > self.match_radius_px, d, hand, prev));
            }
        }
        pairs.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.total_cmp(&b.1)));

        let mut slots: Vec<Option<SlotId>> = vec![None; anchors.len()];
        let mut taken = vec![false; self.previous.len()];
        for (_, d, hand, prev) in pairs {
            if slots[hand].is_some() || taken[prev] {
                continue;
            }
            taken[prev] = true;
            slots[hand] = Some(self.previous[prev].0);
            trace!(slot = %self.previous[prev].0, hand, distance = d, "hand matched to slot");
        }

        let mut current = Vec::with_capacity(anchors.len());
        for (hand, anchor) in anchors.iter().enumerate() {
            let Some(anchor) = anchor else { continue };
            let slot = *slots[hand].get_or_insert_with(|| {
                let id = SlotId(self.next_id);
                self.next_id += 1;
                trace!(slot = %id, hand, "new hand slot");
                id
            });
            current.push((slot, *anchor));
        }
        self.previous = current;
        slots
    }
}

#[cfg(test)]
pub(crate) fn hand_with(index_tip: (f32, f32), thumb_tip: (f32, f32)) -> HandObservation {
    let mut points = vec![Landmark::new(0.5, 0.9); landmarks::COUNT];
    points[landmarks::INDEX_FINGER_TIP] = Landmark::new(index_tip.0, index_tip.1);
    points[landmarks::THUMB_TIP] = Landmark::new(thumb_tip.0, thumb_tip.1);
    HandObservation::new(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::CanvasSize;

    fn mapper() -> CoordinateMapper {
        CoordinateMapper::new(CanvasSize::new(1280, 720))
    }

    #[test]
    fn pinch_threshold_is_strict() {
        let classifier = GestureClassifier::new(30.0);
        let tip = Point2::new(640.0, 360.0);

        let at = classifier.classify_points(tip, Point2::new(670.0, 360.0));
        assert_eq!(at.pinch_distance, 30.0);
        assert!(!at.is_shooting);

        let under = classifier.classify_points(tip, Point2::new(669.99, 360.0));
        assert!(under.is_shooting);
    }

    #[test]
    fn exact_threshold_from_normalized_landmarks() {
        // 670 / 1280 is exactly representable, so the distance is exactly 30px.
        let hand = hand_with((0.5, 0.5), (0.5234375, 0.5));
        let pose = GestureClassifier::new(30.0).classify(&hand, &mapper()).unwrap();
        assert_eq!(pose.pinch_distance, 30.0);
        assert!(!pose.is_shooting);
    }

    #[test]
    fn missing_fingertips_skip_the_hand() {
        let classifier = GestureClassifier::new(30.0);
        let short = HandObservation::new(vec![Landmark::new(0.1, 0.1); 5]);
        assert!(classifier.classify(&short, &mapper()).is_none());
        assert!(classifier.classify(&HandObservation::default(), &mapper()).is_none());
    }

    #[test]
    fn fingertip_is_reported_in_render_space() {
        let hand = hand_with((0.2, 0.5), (0.2, 0.5));
        let pose = GestureClassifier::new(30.0).classify(&hand, &mapper()).unwrap();
        assert_eq!(pose.fingertip, Point2::new(256.0, 360.0));
        assert!(pose.is_shooting);
    }

    #[test]
    fn positional_slots_follow_list_order() {
        let mut tracker = SlotTracker::new(SlotAssignment::Positional, 100.0);
        let slots = tracker.assign(&[None, Some(Point2::new(1.0, 1.0))]);
        assert_eq!(slots, vec![Some(SlotId(0)), Some(SlotId(1))]);
    }

    #[test]
    fn nearest_slots_survive_reordering() {
        let mut tracker = SlotTracker::new(SlotAssignment::Nearest, 160.0);
        let left = Point2::new(200.0, 300.0);
        let right = Point2::new(1000.0, 300.0);

        let first = tracker.assign(&[Some(left), Some(right)]);
        // Detector swaps the order; each hand keeps its slot.
        let second = tracker.assign(&[
            Some(right + nalgebra::Vector2::new(5.0, 0.0)),
            Some(left + nalgebra::Vector2::new(-5.0, 2.0)),
        ]);
        assert_eq!(second, vec![first[1], first[0]]);
    }

    #[test]
    fn vanished_slot_is_not_reused() {
        let mut tracker = SlotTracker::new(SlotAssignment::Nearest, 160.0);
        let p = Point2::new(400.0, 400.0);
        let first = tracker.assign(&[Some(p)]);
        assert_eq!(tracker.assign(&[]), Vec::<Option<SlotId>>::new());
        let again = tracker.assign(&[Some(p)]);
        assert_ne!(first, again);
    }

    #[test]
    fn lone_hand_keeps_its_slot_across_a_far_jump() {
        let mut tracker = SlotTracker::new(SlotAssignment::Nearest, 50.0);
        let first = tracker.assign(&[Some(Point2::new(100.0, 100.0))]);
        let second = tracker.assign(&[Some(Point2::new(900.0, 100.0))]);
        assert_eq!(first, second);
    }

    #[test]
    fn close_hand_wins_the_slot_and_far_newcomer_starts_fresh() {
        let mut tracker = SlotTracker::new(SlotAssignment::Nearest, 50.0);
        let first = tracker.assign(&[Some(Point2::new(100.0, 100.0))]);
        let second = tracker.assign(&[
            Some(Point2::new(900.0, 100.0)),
            Some(Point2::new(110.0, 100.0)),
        ]);
        assert_eq!(second[1], first[0]);
        assert!(second[0].is_some());
        assert_ne!(second[0], first[0]);
    }

    #[test]
    fn in_radius_match_beats_a_closer_far_pair() {
        // Previous slots at 0 and 300; the hand at 320 is within the radius
        // of slot b, so slot a goes to the remaining hand at 700.
        let mut tracker = SlotTracker::new(SlotAssignment::Nearest, 50.0);
        let prev = tracker.assign(&[Some(Point2::new(0.0, 0.0)), Some(Point2::new(300.0, 0.0))]);
        let next = tracker.assign(&[Some(Point2::new(700.0, 0.0)), Some(Point2::new(320.0, 0.0))]);
        assert_eq!(next, vec![prev[0], prev[1]]);
    }

    #[test]
    fn untrackable_hand_gets_no_slot() {
        let mut tracker = SlotTracker::new(SlotAssignment::Nearest, 50.0);
        let slots = tracker.assign(&[None, Some(Point2::new(10.0, 10.0))]);
        assert_eq!(slots[0], None);
        assert!(slots[1].is_some());
    }
}

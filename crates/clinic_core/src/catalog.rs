//! crates/clinic_core/src/catalog.rs
//!
//! Static clinic content: contact details, services, doctors, testimonials,
//! the handful of localized UI strings the components emit themselves, and the
//! chat system prompt built from all of it.

use crate::domain::{ClinicInfo, Doctor, Language, LocalizedString, Service, Testimonial};

pub const CLINIC_INFO: ClinicInfo = ClinicInfo {
    name: "SmileCare Dental",
    chinese_name: "微笑牙科",
    address: LocalizedString::new(
        "123 Kangjian Road, Chaoyang District, Beijing",
        "北京市朝阳区康健路123号",
    ),
    phone: "+86 10 1234 5678",
    email: "contact@smilecaredental.com",
    opening_hours: LocalizedString::new("Mon-Sat: 9:00 AM - 6:00 PM", "周一至周六: 9:00 - 18:00"),
};

pub const SERVICES: &[Service] = &[
    Service {
        id: "1",
        title: LocalizedString::new("Teeth Cleaning", "超声波洁牙"),
        description: LocalizedString::new(
            "Professional ultrasonic cleaning to remove plaque and tartar buildup, ensuring gum health.",
            "专业超声波洁牙，去除牙菌斑和牙结石，确保牙龈健康。",
        ),
        icon: "Sparkles",
        price_start: "¥300",
    },
    Service {
        id: "2",
        title: LocalizedString::new("Teeth Whitening", "牙齿冷光美白"),
        description: LocalizedString::new(
            "Advanced laser whitening treatment to brighten your smile by up to 8 shades in one session.",
            "先进的冷光美白治疗，一次疗程即可让您的笑容提亮多达8个色阶。",
        ),
        icon: "Sun",
        price_start: "¥1200",
    },
    Service {
        id: "3",
        title: LocalizedString::new("Dental Implants", "种植牙"),
        description: LocalizedString::new(
            "Permanent solution for missing teeth using high-grade titanium implants and ceramic crowns.",
            "使用高档钛合金植入体和全瓷牙冠，为缺失牙齿提供永久性解决方案。",
        ),
        icon: "Anchor",
        price_start: "¥6000",
    },
    Service {
        id: "4",
        title: LocalizedString::new("Orthodontics", "牙齿矫正"),
        description: LocalizedString::new(
            "Correction of teeth alignment using traditional braces or invisible clear aligners (Invisalign).",
            "使用传统牙套或隐形矫正器（隐适美）矫正牙齿排列。",
        ),
        icon: "Smile",
        price_start: "¥15000",
    },
    Service {
        id: "5",
        title: LocalizedString::new("Root Canal", "根管治疗"),
        description: LocalizedString::new(
            "Pain-free root canal therapy to save infected teeth and restore full function.",
            "无痛根管治疗，挽救感染牙齿并恢复全部功能。",
        ),
        icon: "Activity",
        price_start: "¥1500",
    },
    Service {
        id: "6",
        title: LocalizedString::new("Pediatric Dentistry", "儿童齿科"),
        description: LocalizedString::new(
            "Gentle dental care specifically designed for children to build healthy habits early.",
            "专为儿童设计的温和牙科护理，从小培养健康的口腔习惯。",
        ),
        icon: "Heart",
        price_start: "¥200",
    },
];

pub const DOCTORS: &[Doctor] = &[
    Doctor {
        id: "d1",
        name: LocalizedString::new("Dr. Li Wei", "李伟 医生"),
        title: LocalizedString::new("Chief Dentist", "首席牙医"),
        specialty: LocalizedString::new("Implantology & Surgery", "种植与外科"),
        image: "https://picsum.photos/300/300?random=1",
        experience: LocalizedString::new("15 Years", "15年经验"),
        bio: LocalizedString::new(
            "Dr. Li has over 15 years of experience in complex dental implants and oral surgery. He is known for his precision and patient-first approach.",
            "李医生在复杂的种植牙和口腔外科领域拥有超过15年的经验。他以手术精准和“患者至上”的理念而闻名。",
        ),
        education: LocalizedString::new(
            "PhD in Oral Surgery from Peking University School of Stomatology.",
            "北京大学口腔医学院口腔外科学博士。",
        ),
    },
    Doctor {
        id: "d2",
        name: LocalizedString::new("Dr. Sarah Chen", "Sarah Chen 医生"),
        title: LocalizedString::new("Senior Orthodontist", "资深正畸医师"),
        specialty: LocalizedString::new("Invisalign & Braces", "隐适美与牙套"),
        image: "https://picsum.photos/300/300?random=2",
        experience: LocalizedString::new("10 Years", "10年经验"),
        bio: LocalizedString::new(
            "Specializing in digital orthodontics, Dr. Chen has helped thousands of patients achieve perfect smiles using the latest Invisalign technology.",
            "陈医生专注于数字化正畸，已使用最新的隐适美技术帮助数千名患者实现了完美的笑容。",
        ),
        education: LocalizedString::new(
            "Master of Orthodontics, Shanghai Jiao Tong University.",
            "上海交通大学正畸学硕士。",
        ),
    },
    Doctor {
        id: "d3",
        name: LocalizedString::new("Dr. Wang Jun", "王俊 医生"),
        title: LocalizedString::new("General Dentist", "全科牙医"),
        specialty: LocalizedString::new("Restorative & Cosmetic", "修复与美容"),
        image: "https://picsum.photos/300/300?random=3",
        experience: LocalizedString::new("8 Years", "8年经验"),
        bio: LocalizedString::new(
            "Dr. Wang excels in aesthetic restorative dentistry, including veneers and full-mouth rehabilitation, focusing on natural-looking results.",
            "王医生在美学修复牙科方面表现出色，包括瓷贴面和全口重建，专注于打造自然美观的治疗效果。",
        ),
        education: LocalizedString::new(
            "BDS, Sichuan University West China College of Stomatology.",
            "四川大学华西口腔医学院学士。",
        ),
    },
];

pub const TESTIMONIALS: &[Testimonial] = &[
    Testimonial {
        id: "t1",
        name: LocalizedString::new("Zhang Min", "张敏"),
        comment: LocalizedString::new(
            "The best dental experience I have ever had. Painless and very professional.",
            "这是我有过的最好的看牙经历。无痛且非常专业。",
        ),
        rating: 5,
    },
    Testimonial {
        id: "t2",
        name: LocalizedString::new("Michael Ross", "Michael Ross"),
        comment: LocalizedString::new(
            "Great English speaking staff. Dr. Li explained everything clearly regarding my implant.",
            "很棒的英语服务。李医生清楚地解释了关于我种植牙的所有事项。",
        ),
        rating: 5,
    },
    Testimonial {
        id: "t3",
        name: LocalizedString::new("Liu Fang", "刘芳"),
        comment: LocalizedString::new(
            "My kids love coming here. The pediatric room is very welcoming.",
            "我的孩子们很喜欢来这里。儿童诊室非常温馨。",
        ),
        rating: 4,
    },
];

//=========================================================================================
// Component Strings
//=========================================================================================

pub const CHAT_GREETING: LocalizedString = LocalizedString::new(
    "Hello! I am SmileBot 🦷. How can I help you with your dental needs today?",
    "您好！我是 SmileBot 🦷。今天有什么可以帮您的吗？",
);

pub const CHAT_APOLOGY: LocalizedString = LocalizedString::new(
    "I'm sorry, I'm having trouble connecting to the dental database right now. Please try again later.",
    "抱歉，我现在无法连接到牙科数据库。请稍后再试。",
);

pub const ADMIN_INCORRECT_PASSWORD: &str = "Incorrect password.";

/// The confirmation shown once a booking has been recorded.
pub fn booking_success_message(language: Language, name: &str, date: &str, phone: &str) -> String {
    match language {
        Language::En => format!(
            "Thank you, {name}. We have received your appointment request for {date}. Our team will contact you at {phone} shortly to finalize the details."
        ),
        Language::Zh => format!(
            "谢谢您，{name}。我们已收到您 {date} 的预约请求。我们的团队稍后将致电 {phone} 与您确认详细信息。"
        ),
    }
}

//=========================================================================================
// Chat System Prompt
//=========================================================================================

/// Builds the fixed instruction the chat session is created with.
pub fn system_instruction() -> String {
    let services = SERVICES
        .iter()
        .map(|s| {
            format!(
                "- {} / {}: {} (Starts at {})",
                s.title.en, s.title.zh, s.description.en, s.price_start
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let doctors = DOCTORS
        .iter()
        .map(|d| {
            format!(
                "- {} / {} ({}): Specialist in {}",
                d.name.en, d.name.zh, d.title.en, d.specialty.en
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"You are 'SmileBot', the friendly and professional AI receptionist for {name} ({chinese_name}).

Clinic Details:
- Address (EN): {address_en}
- Address (ZH): {address_zh}
- Phone: {phone}
- Hours: {hours}

Services Offered:
{services}

Doctors:
{doctors}

Your goal is to answer patient questions about services, prices, doctors, and general dental advice.
If a user wants to book an appointment, guide them to use the "Book Appointment" form on the website (you cannot book it directly, just encourage them to scroll down to the form).
Keep answers concise, polite, and reassuring.
You can speak both English and Chinese fluently. Detect the user's language and respond in the same language."#,
        name = CLINIC_INFO.name,
        chinese_name = CLINIC_INFO.chinese_name,
        address_en = CLINIC_INFO.address.en,
        address_zh = CLINIC_INFO.address.zh,
        phone = CLINIC_INFO.phone,
        hours = CLINIC_INFO.opening_hours.en,
    )
}
